//! Contents tables: columns, restrictions and row counts.

use crate::context::{MapiContext, ObjectEntry};
use crate::error::{MapiError, MapiResult};
use crate::handle::{MapiObject, ObjectKind};
use crate::session::{created_handle, decode_reply, Target};
use mapi_codec::PropertyTag;
use mapi_protocol::{
    GetContentsTableReply, GetContentsTableRequest, QueryPositionReply, RestrictRequest,
    Restriction, RopRequest, SetColumnsRequest, TableStatusReply,
};

impl MapiContext {
    /// Opens the contents table of a folder.
    ///
    /// Returns the table and the number of rows it held when opened.
    pub fn get_contents_table(&mut self, folder: MapiObject) -> MapiResult<(MapiObject, u32)> {
        self.tracked(|ctx| {
            let session = ctx.entry_of(folder, &[ObjectKind::Folder])?.session;
            let request = RopRequest::GetContentsTable(GetContentsTableRequest {
                output_handle_index: 1,
                table_flags: 0,
            });
            let response = ctx.transact(Target::Object(folder), request)?;
            let reply: GetContentsTableReply = decode_reply(&response)?;
            let handle = created_handle(&response, 1)?;
            let table = ctx.register(ObjectEntry {
                session,
                handle,
                id: 0,
                kind: ObjectKind::Table,
                logon: None,
            });
            Ok((table, reply.row_count))
        })
    }

    /// Selects the columns a table returns.
    pub fn set_columns(&mut self, table: MapiObject, columns: &[PropertyTag]) -> MapiResult<()> {
        self.tracked(|ctx| {
            ctx.entry_of(table, &[ObjectKind::Table])?;
            if columns.is_empty() {
                return Err(MapiError::invalid_parameter("no columns"));
            }
            let request = RopRequest::SetColumns(SetColumnsRequest {
                flags: 0,
                columns: columns.to_vec(),
            });
            let response = ctx.transact(Target::Object(table), request)?;
            let _status: TableStatusReply = decode_reply(&response)?;
            Ok(())
        })
    }

    /// Filters a table's rows; `None` removes the filter.
    pub fn restrict(
        &mut self,
        table: MapiObject,
        restriction: Option<&Restriction>,
    ) -> MapiResult<()> {
        self.tracked(|ctx| {
            ctx.entry_of(table, &[ObjectKind::Table])?;
            let request = RopRequest::Restrict(RestrictRequest {
                flags: 0,
                restriction: restriction.cloned(),
            });
            let response = ctx.transact(Target::Object(table), request)?;
            let _status: TableStatusReply = decode_reply(&response)?;
            Ok(())
        })
    }

    /// Number of rows the table currently holds.
    pub fn get_row_count(&mut self, table: MapiObject) -> MapiResult<u32> {
        self.tracked(|ctx| {
            ctx.entry_of(table, &[ObjectKind::Table])?;
            let response = ctx.transact(Target::Object(table), RopRequest::QueryPosition)?;
            let reply: QueryPositionReply = decode_reply(&response)?;
            Ok(reply.denominator)
        })
    }
}
