//! Registry caching and configuration behavior.

use std::sync::Arc;
use std::thread;

use std::collections::BTreeMap;

use fieldwise_map::{MapperConfig, MapperRegistry, NameMatcher, TableMatcher};
use fieldwise_model::{CasePolicy, Members, Reflect};

#[derive(Debug, Default)]
struct Order {
    reference: String,
    total: i64,
}

impl Reflect for Order {
    fn reflect(members: &mut Members<Self>) {
        members
            .field(
                "Reference",
                |o: &Order| o.reference.clone(),
                |o, v| o.reference = v,
            )
            .field("Total", |o: &Order| o.total, |o, v| o.total = v);
    }
}

#[derive(Debug, Default)]
struct OrderView {
    reference: String,
    total: i64,
}

impl Reflect for OrderView {
    fn reflect(members: &mut Members<Self>) {
        members
            .field(
                "Reference",
                |o: &OrderView| o.reference.clone(),
                |o, v| o.reference = v,
            )
            .field("Total", |o: &OrderView| o.total, |o, v| o.total = v);
    }
}

fn order() -> Order {
    Order {
        reference: "ORD-7".into(),
        total: 250,
    }
}

#[test]
fn get_returns_the_same_mapper_per_type_pair() {
    let registry = MapperRegistry::new();

    let first = registry.get::<OrderView, Order>();
    let second = registry.get::<OrderView, Order>();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
}

#[test]
fn distinct_configurations_cache_independently() {
    let registry = MapperRegistry::new();

    let default = registry.get::<OrderView, Order>();
    let sensitive = registry.get_with::<OrderView, Order>(
        MapperConfig::default()
            .with_case(CasePolicy::Sensitive)
            .with_matcher(NameMatcher::new(CasePolicy::Sensitive)),
    );

    assert!(!Arc::ptr_eq(&default, &sensitive));
    assert_eq!(registry.len(), 2);
}

#[test]
fn distinct_inline_tables_cache_independently() {
    fn inline(entries: &[(&str, &str)]) -> TableMatcher {
        TableMatcher::from_table(
            entries
                .iter()
                .map(|(d, s)| (d.to_string(), s.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    let registry = MapperRegistry::new();

    let full = registry.get_with::<OrderView, Order>(
        MapperConfig::default()
            .with_matcher(inline(&[("Reference", "Reference"), ("Total", "Total")])),
    );
    let partial = registry
        .get_with::<OrderView, Order>(MapperConfig::default().with_matcher(inline(&[(
            "Total", "Total",
        )])));

    assert!(!Arc::ptr_eq(&full, &partial));
    assert_eq!(registry.len(), 2);

    assert_eq!(full.map(&order()).unwrap().reference, "ORD-7");
    // the second table never pairs Reference
    assert_eq!(partial.map(&order()).unwrap().reference, "");
}

#[test]
fn get_new_returns_private_instances() {
    let registry = MapperRegistry::new();

    let private = registry.get_new::<OrderView, Order>();
    private.field_set("Reference", "private");

    let shared = registry.get::<OrderView, Order>();
    let view = shared.map(&order()).unwrap();
    assert_eq!(view.reference, "ORD-7");

    let view = private.map(&order()).unwrap();
    assert_eq!(view.reference, "private");
}

#[test]
fn configure_replaces_the_cached_mapper() {
    let registry = MapperRegistry::new();

    let before = registry.get::<OrderView, Order>();
    let view = before.map(&order()).unwrap();
    assert_eq!(view.total, 250);

    registry.configure::<OrderView, Order>(|mapper| {
        mapper.field_skip("Total");
    });

    let after = registry.get::<OrderView, Order>();
    assert!(!Arc::ptr_eq(&before, &after));
    let view = after.map(&order()).unwrap();
    assert_eq!(view.total, 0);
    assert_eq!(view.reference, "ORD-7");

    // the replaced handle keeps its old rules
    let view = before.map(&order()).unwrap();
    assert_eq!(view.total, 250);
}

#[test]
fn one_call_mapping_goes_through_the_cache() {
    let registry = MapperRegistry::new();

    let view: OrderView = registry.map(&order()).unwrap();
    assert_eq!(view.reference, "ORD-7");
    assert_eq!(registry.len(), 1);

    let mut target = OrderView::default();
    registry.map_into(&mut target, &order()).unwrap();
    assert_eq!(target.total, 250);
    assert_eq!(registry.len(), 1);
}

#[test]
fn concurrent_lookups_agree_on_one_mapper() {
    let registry = Arc::new(MapperRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                let mapper = registry.get::<OrderView, Order>();
                mapper.map(&order()).unwrap();
                Arc::as_ptr(&mapper) as usize
            })
        })
        .collect();

    let pointers: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(pointers.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(registry.len(), 1);
}

#[test]
fn shared_registry_is_a_singleton() {
    let first = MapperRegistry::shared();
    let second = MapperRegistry::shared();
    assert!(std::ptr::eq(first, second));
}
