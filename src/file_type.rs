//! The three Open Payments detail files.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    convert::Strategy,
    schema::{ColumnSchema, ColumnSpec, SemanticType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileType {
    /// Physician ownership and investment interests
    Ownership,
    /// Research payments
    Research,
    /// General (non-research) payments; by far the largest file
    General,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Research, FileType::Ownership, FileType::General];

    pub fn tag(&self) -> &'static str {
        match self {
            FileType::Ownership => "OWNRSHP",
            FileType::Research => "RSRCH",
            FileType::General => "GNRL",
        }
    }

    fn file_marker(&self) -> &'static str {
        match self {
            FileType::Ownership => "DTL_OWNRSHP",
            FileType::Research => "DTL_RSRCH",
            FileType::General => "DTL_GNRL",
        }
    }

    /// Tags an extracted file by name; non-CSV and unrelated files get `None`.
    pub fn detect(file_name: &str) -> Option<FileType> {
        let is_csv = file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return None;
        }
        FileType::ALL
            .into_iter()
            .find(|ty| file_name.contains(ty.file_marker()))
    }

    pub fn default_strategy(&self) -> Strategy {
        match self {
            FileType::Ownership | FileType::Research => Strategy::Strict,
            FileType::General => Strategy::Lenient,
        }
    }

    pub fn output_file_name(&self, year: i32) -> String {
        format!("{}_{year}.parquet", self.tag())
    }

    pub fn builtin_schema(&self) -> Result<ColumnSchema> {
        let columns = match self {
            FileType::Ownership => Vec::new(),
            FileType::Research => research_columns(),
            FileType::General => general_columns(),
        };
        ColumnSchema::new(columns)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FileType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let upper = value.trim().to_ascii_uppercase();
        FileType::ALL
            .into_iter()
            .find(|ty| ty.tag() == upper)
            .ok_or_else(|| anyhow!("Unknown file type '{value}' (expected RSRCH, OWNRSHP or GNRL)"))
    }
}

impl Serialize for FileType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for FileType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        FileType::from_str(&raw).map_err(de::Error::custom)
    }
}

fn text(columns: &mut Vec<ColumnSpec>, name: impl Into<String>) {
    columns.push(ColumnSpec::new(name, SemanticType::Text));
}

fn integer(columns: &mut Vec<ColumnSpec>, name: impl Into<String>) {
    columns.push(ColumnSpec::new(name, SemanticType::Integer));
}

const RECIPIENT_FIELDS: &[&str] = &[
    "Teaching_Hospital_CCN",
    "Teaching_Hospital_ID",
    "Teaching_Hospital_Name",
    "Covered_Recipient_Profile_ID",
    "Covered_Recipient_NPI",
    "Covered_Recipient_First_Name",
    "Covered_Recipient_Middle_Name",
    "Covered_Recipient_Last_Name",
    "Covered_Recipient_Name_Suffix",
    "Recipient_Primary_Business_Street_Address_Line1",
    "Recipient_Primary_Business_Street_Address_Line2",
    "Recipient_City",
    "Recipient_State",
    "Recipient_Zip_Code",
    "Recipient_Country",
    "Recipient_Province",
    "Recipient_Postal_Code",
];

const INVESTIGATOR_FIELDS: &[&str] = &[
    "Covered_Recipient_Type",
    "Profile_ID",
    "NPI",
    "First_Name",
    "Middle_Name",
    "Last_Name",
    "Name_Suffix",
    "Business_Street_Address_Line1",
    "Business_Street_Address_Line2",
    "City",
    "State",
    "Zip_Code",
    "Country",
    "Province",
    "Postal_Code",
];

const GENERAL_PAYMENT_FIELDS: &[&str] = &[
    "Form_of_Payment_or_Transfer_of_Value",
    "Nature_of_Payment_or_Transfer_of_Value",
    "City_of_Travel",
    "State_of_Travel",
    "Country_of_Travel",
    "Physician_Ownership_Indicator",
    "Third_Party_Payment_Recipient_Indicator",
    "Name_of_Third_Party_Entity_Receiving_Payment_or_Transfer_of_Value",
    "Charity_Indicator",
    "Third_Party_Equals_Covered_Recipient_Indicator",
    "Contextual_Information",
    "Delay_in_Publication_Indicator",
];

/// Type, specialty and license columns repeated for every recipient block.
fn practice_columns(columns: &mut Vec<ColumnSpec>, prefix: &str) {
    for n in 1..=6 {
        text(columns, format!("{prefix}_Primary_Type_{n}"));
    }
    for n in 1..=6 {
        text(columns, format!("{prefix}_Specialty_{n}"));
    }
    for n in 1..=5 {
        text(columns, format!("{prefix}_License_State_code{n}"));
    }
}

fn recipient_columns(columns: &mut Vec<ColumnSpec>) {
    for field in RECIPIENT_FIELDS {
        text(columns, *field);
    }
    practice_columns(columns, "Covered_Recipient");
}

fn manufacturer_columns(columns: &mut Vec<ColumnSpec>, payer_id: SemanticType) {
    text(columns, "Submitting_Applicable_Manufacturer_or_Applicable_GPO_Name");
    columns.push(ColumnSpec::new(
        "Applicable_Manufacturer_or_Applicable_GPO_Making_Payment_ID",
        payer_id,
    ));
    for field in ["Name", "State", "Country"] {
        text(
            columns,
            format!("Applicable_Manufacturer_or_Applicable_GPO_Making_Payment_{field}"),
        );
    }
}

fn product_columns(columns: &mut Vec<ColumnSpec>) {
    text(columns, "Related_Product_Indicator");
    for n in 1..=5 {
        text(columns, format!("Covered_or_Noncovered_Indicator_{n}"));
        text(
            columns,
            format!("Indicate_Drug_or_Biological_or_Device_or_Medical_Supply_{n}"),
        );
        text(columns, format!("Product_Category_or_Therapeutic_Area_{n}"));
        text(
            columns,
            format!("Name_of_Drug_or_Biological_or_Device_or_Medical_Supply_{n}"),
        );
        text(columns, format!("Associated_Drug_or_Biological_NDC_{n}"));
        text(columns, format!("Associated_Device_or_Medical_Supply_PDI_{n}"));
    }
}

fn research_columns() -> Vec<ColumnSpec> {
    let mut columns = Vec::new();
    text(&mut columns, "Change_Type");
    text(&mut columns, "Covered_Recipient_Type");
    text(&mut columns, "Noncovered_Recipient_Entity_Name");
    recipient_columns(&mut columns);
    for investigator in 1..=5 {
        let prefix = format!("Principal_Investigator_{investigator}");
        for field in INVESTIGATOR_FIELDS {
            text(&mut columns, format!("{prefix}_{field}"));
        }
        practice_columns(&mut columns, &prefix);
    }
    manufacturer_columns(&mut columns, SemanticType::Integer);
    product_columns(&mut columns);
    text(&mut columns, "Total_Amount_of_Payment_USDollars");
    text(&mut columns, "Date_of_Payment");
    text(&mut columns, "Form_of_Payment_or_Transfer_of_Value");
    for n in 1..=6 {
        text(&mut columns, format!("Expenditure_Category{n}"));
    }
    for field in [
        "Preclinical_Research_Indicator",
        "Delay_in_Publication_Indicator",
        "Name_of_Study",
        "Dispute_Status_for_Publication",
    ] {
        text(&mut columns, field);
    }
    integer(&mut columns, "Record_ID");
    integer(&mut columns, "Program_Year");
    for field in [
        "Payment_Publication_Date",
        "ClinicalTrials_Gov_Identifier",
        "Research_Information_Link",
        "Context_of_Research",
    ] {
        text(&mut columns, field);
    }
    columns
}

fn general_columns() -> Vec<ColumnSpec> {
    let mut columns = Vec::new();
    text(&mut columns, "Change_Type");
    text(&mut columns, "Covered_Recipient_Type");
    recipient_columns(&mut columns);
    manufacturer_columns(&mut columns, SemanticType::Text);
    text(&mut columns, "Total_Amount_of_Payment_USDollars");
    text(&mut columns, "Date_of_Payment");
    integer(&mut columns, "Number_of_Payments_Included_in_Total_Amount");
    for field in GENERAL_PAYMENT_FIELDS {
        text(&mut columns, *field);
    }
    // GNRL record ids are kept verbatim
    text(&mut columns, "Record_ID");
    text(&mut columns, "Dispute_Status_for_Publication");
    product_columns(&mut columns);
    integer(&mut columns, "Program_Year");
    text(&mut columns, "Payment_Publication_Date");
    columns
}
