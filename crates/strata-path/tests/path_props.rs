use proptest::prelude::*;
use strata_path::ScenePath;

const PROPTEST_CASES: u32 = 512;

// A small name pool keeps shrinking effective and makes ancestor/sibling
// collisions likely, which is where the path algebra earns its keep.
const NAMES: [&str; 6] = ["World", "Set_1", "Set_12", "Prop_1", "rig", "_geo"];

fn arb_path() -> impl Strategy<Value = ScenePath> {
    prop::collection::vec(prop::sample::select(&NAMES[..]), 0..=4).prop_map(|components| {
        let mut path = ScenePath::absolute_root();
        for component in components {
            path = path.append_child(component).unwrap();
        }
        path
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: PROPTEST_CASES, .. ProptestConfig::default() })]

    #[test]
    fn textual_form_round_trips(path in arb_path()) {
        prop_assert_eq!(ScenePath::parse(path.as_str()).unwrap(), path);
    }

    #[test]
    fn parent_inverts_append_child(path in arb_path(), name in prop::sample::select(&NAMES[..])) {
        let child = path.append_child(name).unwrap();
        prop_assert_eq!(child.parent().unwrap(), path);
        prop_assert_eq!(child.name(), name);
    }

    #[test]
    fn prefix_of_means_ancestor_or_self(a in arb_path(), b in arb_path()) {
        let a_components: Vec<&str> = a.components().collect();
        let b_components: Vec<&str> = b.components().collect();
        prop_assert_eq!(
            a.has_prefix(&b),
            a_components.starts_with(&b_components)
        );
    }

    #[test]
    fn ordering_matches_component_order(a in arb_path(), b in arb_path()) {
        let a_components: Vec<&str> = a.components().collect();
        let b_components: Vec<&str> = b.components().collect();
        prop_assert_eq!(a.cmp(&b), a_components.cmp(&b_components));
    }

    #[test]
    fn sorted_paths_keep_subtrees_contiguous(
        paths in prop::collection::btree_set(arb_path(), 1..24),
        root in arb_path(),
    ) {
        let paths: Vec<ScenePath> = paths.into_iter().collect();
        let in_subtree: Vec<bool> = paths.iter().map(|p| p.has_prefix(&root)).collect();
        let first = in_subtree.iter().position(|&hit| hit);
        let last = in_subtree.iter().rposition(|&hit| hit);
        if let (Some(first), Some(last)) = (first, last) {
            // Every path between the first and last hit is also a hit.
            prop_assert!(in_subtree[first..=last].iter().all(|&hit| hit));
        }
    }

    #[test]
    fn replace_prefix_round_trips(suffix in arb_path(), old in arb_path(), new in arb_path()) {
        // Rebase `suffix` under `old` so the prefix is present by construction.
        let path = suffix
            .replace_prefix(&ScenePath::absolute_root(), &old)
            .unwrap();
        let rewritten = path.replace_prefix(&old, &new).unwrap();
        prop_assert!(rewritten.has_prefix(&new));
        prop_assert_eq!(rewritten.replace_prefix(&new, &old).unwrap(), path);
    }
}
