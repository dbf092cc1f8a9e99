use proptest::prelude::*;
use triggers::{
    AbbreviationConfig, Phrase, TriggerTree, Triggers, build_phrase,
    matching::{abbreviation_match, partition},
};

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

/// A folder chain `depth` levels deep with one phrase at the bottom.
fn chain(depth: usize) -> (TriggerTree, Vec<triggers::NodeId>) {
    let mut tree = TriggerTree::new("root");
    let mut path = vec![tree.root()];
    for i in 0..depth {
        let parent = path[path.len() - 1];
        path.push(tree.add_folder(parent, format!("f{i}"), Triggers::default()).unwrap());
    }
    let parent = path[path.len() - 1];
    path.push(
        tree.add_phrase(parent, Phrase::new("leaf", "text"), Triggers::abbreviation("lf"))
            .unwrap(),
    );
    (tree, path)
}

proptest! {
    #[test]
    fn partition_reassembles_buffer(abbr in word(), before in "[a-z .]{0,12}", after in "[a-z .]{0,3}") {
        let cfg = AbbreviationConfig::new(abbr.clone());
        let buffer = format!("{before}{abbr}{after}");
        let p = partition(&cfg, &buffer).unwrap();
        prop_assert_eq!(format!("{}{}{}", p.before, p.matched, p.after), buffer);
        prop_assert_eq!(p.matched, abbr.clone());
        // Rightmost occurrence: the abbreviation never appears in what follows.
        prop_assert!(!p.after.contains(&abbr));
    }
}

proptest! {
    #[test]
    fn fires_only_with_single_boundary(abbr in word(), sep in "[ .,;!?]", tail in "[a-z]{0,2}") {
        let cfg = AbbreviationConfig::new(abbr.clone());
        let fired = format!("x {abbr}{sep}");
        prop_assert!(abbreviation_match(&cfg, &fired).is_some());
        let extra = format!("x {abbr}{sep}{tail}");
        prop_assert_eq!(abbreviation_match(&cfg, &extra).is_some(), tail.is_empty());
    }
}

proptest! {
    #[test]
    fn ignore_case_matches_any_casing(abbr in word(), upper_mask in any::<u8>()) {
        let typed: String = abbr
            .chars()
            .enumerate()
            .map(|(i, c)| if (upper_mask >> (i % 8)) & 1 == 1 { c.to_ascii_uppercase() } else { c })
            .collect();
        let mut cfg = AbbreviationConfig::new(abbr);
        cfg.ignore_case = true;
        let p = abbreviation_match(&cfg, &format!("{typed} ")).unwrap();
        prop_assert_eq!(p.matched, typed);
    }
}

proptest! {
    #[test]
    fn usage_reaches_every_ancestor(depth in 0usize..6, uses in 1u64..5) {
        let (mut tree, path) = chain(depth);
        let leaf = path[path.len() - 1];
        for _ in 0..uses {
            build_phrase(&mut tree, leaf, "lf ").unwrap();
        }
        for id in path {
            prop_assert_eq!(tree.node(id).unwrap().usage_count, uses);
        }
    }
}

proptest! {
    #[test]
    fn backspaces_cover_abbreviation_and_boundary(abbr in word(), before in "[ .]{0,4}") {
        let mut tree = TriggerTree::new("root");
        let root = tree.root();
        let id = tree
            .add_phrase(root, Phrase::new("p", "out"), Triggers::abbreviation(abbr.clone()))
            .unwrap();
        let e = build_phrase(&mut tree, id, &format!("{before}{abbr} ")).unwrap();
        prop_assert_eq!(e.backspaces, abbr.chars().count() + 1);
        prop_assert_eq!(e.string, "out ");
    }
}
