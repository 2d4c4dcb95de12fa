//! Property-based tests for the cleaning invariants.

use hdw_clean::{clean_entity, dedupe_by_key, reconcile_payment};
use hdw_common::{f64_column, i64_column, is_null_token, parse_f64, text_column};
use hdw_model::Entity;
use polars::prelude::{Column, DataFrame, IntoColumn, NamedFrom, Series};
use proptest::prelude::*;

fn raw_cell() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("NA".to_string())),
        Just(Some("-".to_string())),
        Just(Some("abc".to_string())),
        (-1.0e6f64..1.0e6).prop_map(|v| Some(format!("{v:.2}"))),
        (-1000i64..1000).prop_map(|v| Some(v.to_string())),
    ]
}

/// Raw total_cost, insurance_coverage, patient_payment and visit_duration_days.
type RawVisit = (Option<String>, Option<String>, Option<String>, Option<String>);

fn visit_frame(rows: &[RawVisit]) -> DataFrame {
    let ids: Vec<Option<String>> = (0..rows.len()).map(|idx| Some(idx.to_string())).collect();
    let pick = |f: fn(&RawVisit) -> Option<String>| rows.iter().map(f).collect::<Vec<_>>();
    let cols: Vec<Column> = vec![
        Series::new("visit_id".into(), ids).into_column(),
        Series::new("total_cost".into(), pick(|r| r.0.clone())).into_column(),
        Series::new("insurance_coverage".into(), pick(|r| r.1.clone())).into_column(),
        Series::new("patient_payment".into(), pick(|r| r.2.clone())).into_column(),
        Series::new("visit_duration_days".into(), pick(|r| r.3.clone())).into_column(),
    ];
    DataFrame::new(cols).expect("visit frame")
}

fn payment_was_missing(raw: &Option<String>) -> bool {
    raw.as_deref()
        .is_none_or(|value| is_null_token(value) || parse_f64(value).is_none())
}

proptest! {
    #[test]
    fn monetary_fields_are_never_negative(
        rows in prop::collection::vec((raw_cell(), raw_cell(), raw_cell(), raw_cell()), 0..40)
    ) {
        let (clean, _) = clean_entity(Entity::Visit, visit_frame(&rows)).unwrap();
        for column in ["total_cost", "insurance_coverage", "patient_payment", "visit_duration_days"] {
            for value in f64_column(&clean, column).unwrap() {
                let value = value.expect("monetary value present");
                prop_assert!(value >= 0.0, "{column} = {value}");
            }
        }
    }

    #[test]
    fn missing_payments_are_reconciled(
        rows in prop::collection::vec((raw_cell(), raw_cell(), raw_cell(), raw_cell()), 1..40)
    ) {
        let (clean, _) = clean_entity(Entity::Visit, visit_frame(&rows)).unwrap();
        let costs = f64_column(&clean, "total_cost").unwrap();
        let coverage = f64_column(&clean, "insurance_coverage").unwrap();
        let payments = f64_column(&clean, "patient_payment").unwrap();
        prop_assert_eq!(payments.len(), rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if payment_was_missing(&row.2) {
                let expected = reconcile_payment(costs[idx].unwrap(), coverage[idx].unwrap());
                prop_assert_eq!(payments[idx], Some(expected));
            }
        }
    }

    #[test]
    fn cleaning_is_idempotent(
        rows in prop::collection::vec((raw_cell(), raw_cell(), raw_cell(), raw_cell()), 0..30)
    ) {
        let (once, _) = clean_entity(Entity::Visit, visit_frame(&rows)).unwrap();
        let (twice, report) = clean_entity(Entity::Visit, once.clone()).unwrap();
        prop_assert_eq!(report.duplicates_removed, 0);
        prop_assert!(once.equals_missing(&twice));
    }

    #[test]
    fn dedupe_is_idempotent_and_keys_unique(
        keys in prop::collection::vec(prop::option::of(0i64..8), 0..50)
    ) {
        let names: Vec<String> = keys.iter().map(|key| format!("{key:?}")).collect();
        let cols: Vec<Column> = vec![
            Series::new("patient_id".into(), keys.clone()).into_column(),
            Series::new("patient_name".into(), names).into_column(),
        ];
        let df = DataFrame::new(cols).unwrap();
        let (once, removed) = dedupe_by_key(&df, Some("patient_id")).unwrap();
        prop_assert_eq!(once.height() + removed, keys.len());
        let present: Vec<i64> = i64_column(&once, "patient_id")
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let mut unique = present.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), present.len());
        let (twice, removed_again) = dedupe_by_key(&once, Some("patient_id")).unwrap();
        prop_assert_eq!(removed_again, 0);
        prop_assert_eq!(
            text_column(&once, "patient_name").unwrap(),
            text_column(&twice, "patient_name").unwrap()
        );
    }
}
