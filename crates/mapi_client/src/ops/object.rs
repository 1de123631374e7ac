//! Releasing server objects.

use crate::context::MapiContext;
use crate::error::MapiResult;
use crate::handle::MapiObject;
use crate::session::{decode_reply, Target};
use mapi_protocol::{Empty, RopRequest};
use tracing::debug;

impl MapiContext {
    /// Releases a server object.
    ///
    /// The handle is invalid afterwards even when the server reports a
    /// failure.
    pub fn release(&mut self, obj: MapiObject) -> MapiResult<()> {
        self.tracked(|ctx| {
            let result = ctx
                .transact(Target::Object(obj), RopRequest::Release)
                .and_then(|response| decode_reply::<Empty>(&response).map(|_| ()));
            if let Some(entry) = ctx.forget(obj) {
                debug!(object = %obj, kind = ?entry.kind, handle = entry.handle, "released object");
            }
            result
        })
    }
}
