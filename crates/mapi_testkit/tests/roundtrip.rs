//! Generated restrictions and rows pushed through the full client stack.

use mapi_protocol::DefaultFolder;
use mapi_testkit::generators::{restriction_strategy, row_strategy};
use mapi_testkit::{empty_store, filter, TestMailbox};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn remote_count_matches_local_evaluation(
        rows in prop::collection::vec(row_strategy(), 0..12),
        restriction in restriction_strategy(),
    ) {
        let mut store = empty_store();
        let inbox = store.default_folder(DefaultFolder::Inbox);
        for row in &rows {
            store.add_message(inbox, row.clone()).unwrap();
        }
        let expected = filter(Some(&restriction), store.folder(inbox).unwrap().rows()).count();

        let mailbox = TestMailbox::new(store);
        let (mut ctx, mapi_store) = mailbox.logon().unwrap();
        let folder = ctx.open_folder(mapi_store, inbox).unwrap();
        let (table, total) = ctx.get_contents_table(folder).unwrap();
        prop_assert_eq!(total as usize, rows.len());

        ctx.restrict(table, Some(&restriction)).unwrap();
        prop_assert_eq!(ctx.get_row_count(table).unwrap() as usize, expected);
    }
}

