//! Translation between transient and long-term ids.

use crate::context::MapiContext;
use crate::error::MapiResult;
use crate::handle::MapiObject;
use crate::session::{decode_reply, Target};
use mapi_protocol::{
    IdFromLongTermIdReply, IdFromLongTermIdRequest, LongTermId, LongTermIdFromIdReply,
    LongTermIdFromIdRequest, RopRequest,
};

impl MapiContext {
    /// Converts a transient object id into its long-term form.
    ///
    /// `obj` is any object of the logon the id belongs to, usually the store.
    pub fn long_term_id_from_id(&mut self, obj: MapiObject, id: u64) -> MapiResult<LongTermId> {
        self.tracked(|ctx| {
            let request = RopRequest::LongTermIdFromId(LongTermIdFromIdRequest { id });
            let response = ctx.transact(Target::Object(obj), request)?;
            let reply: LongTermIdFromIdReply = decode_reply(&response)?;
            Ok(LongTermId::copy_normalized(&reply.long_term_id))
        })
    }

    /// Converts a long-term id back into the transient id of this logon.
    pub fn id_from_long_term_id(
        &mut self,
        obj: MapiObject,
        long_term_id: &LongTermId,
    ) -> MapiResult<u64> {
        self.tracked(|ctx| {
            let request = RopRequest::IdFromLongTermId(IdFromLongTermIdRequest {
                long_term_id: LongTermId::copy_normalized(long_term_id),
            });
            let response = ctx.transact(Target::Object(obj), request)?;
            let reply: IdFromLongTermIdReply = decode_reply(&response)?;
            Ok(reply.id)
        })
    }
}
