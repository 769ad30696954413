mod common;

use common::{TestWorkspace, parquet_rows};
use openpayments_ingest::{
    convert::{ConvertOptions, Strategy, convert},
    schema::{ColumnSchema, SemanticType},
};
use proptest::prelude::*;

fn id_amount_schema() -> ColumnSchema {
    ColumnSchema::from_pairs([
        ("id", SemanticType::Integer),
        ("amount", SemanticType::Integer),
    ])
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn strict_preserves_integer_values(values in prop::collection::vec(any::<i64>(), 1..40)) {
        let ws = TestWorkspace::new();
        let mut contents = String::from("id,amount\n");
        for (index, value) in values.iter().enumerate() {
            contents.push_str(&format!("{index},{value}\n"));
        }
        let input = ws.write("ints.csv", &contents);
        let output = ws.join("ints.parquet");

        let report = convert(&input, &output, &id_amount_schema(), Strategy::Strict, &ConvertOptions::default())
            .unwrap();

        prop_assert_eq!(report.rows_written, values.len() as u64);
        let written = parquet_rows(&output)
            .into_iter()
            .map(|row| row[1].parse::<i64>().unwrap())
            .collect::<Vec<_>>();
        prop_assert_eq!(written, values);
    }

    #[test]
    fn lenient_drops_exactly_the_unparseable_rows(
        rows in prop::collection::vec((any::<bool>(), 0i64..1_000_000), 0..60),
        batch_rows in 1usize..16,
    ) {
        let ws = TestWorkspace::new();
        let mut contents = String::from("id,amount\n");
        let mut expected = Vec::new();
        for (index, (valid, amount)) in rows.iter().enumerate() {
            if *valid {
                contents.push_str(&format!("{index},{amount}\n"));
                expected.push(vec![index.to_string(), amount.to_string()]);
            } else {
                contents.push_str(&format!("{index},n/a{amount}\n"));
            }
        }
        let input = ws.write("mixed.csv", &contents);
        let output = ws.join("mixed.parquet");
        let options = ConvertOptions { batch_rows, ..ConvertOptions::default() };

        let report = convert(&input, &output, &id_amount_schema(), Strategy::Lenient, &options).unwrap();

        prop_assert!(report.rows_written <= report.rows_read);
        prop_assert_eq!(report.rows_read, rows.len() as u64);
        prop_assert_eq!(report.rows_dropped(), (rows.len() - expected.len()) as u64);
        prop_assert_eq!(parquet_rows(&output), expected);
    }
}
