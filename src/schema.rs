//! Declared column types and their YAML persistence.

use std::{collections::HashSet, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use arrow::datatypes::DataType;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Text,
    Integer,
    Float,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Text => "Text",
            SemanticType::Integer => "Integer",
            SemanticType::Float => "Float",
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            SemanticType::Text => DataType::Utf8,
            SemanticType::Integer => DataType::Int64,
            SemanticType::Float => DataType::Float64,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "str" | "object" | "varchar" => Ok(SemanticType::Text),
            "integer" | "int" | "int64" | "bigint" => Ok(SemanticType::Integer),
            "float" | "float64" | "double" => Ok(SemanticType::Float),
            other => Err(anyhow!(
                "Unknown column type '{other}' (expected Text, Integer or Float)"
            )),
        }
    }
}

impl Serialize for SemanticType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SemanticType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        SemanticType::from_str(&raw).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub datatype: SemanticType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, datatype: SemanticType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    #[serde(default)]
    columns: Vec<ColumnSpec>,
}

impl ColumnSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        let schema = Self { columns };
        schema.validate()?;
        Ok(schema)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, SemanticType)>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, datatype)| ColumnSpec::new(name, datatype))
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for (idx, column) in self.columns.iter().enumerate() {
            ensure!(
                !column.name.is_empty(),
                "Schema column {} has an empty name",
                idx + 1
            );
            ensure!(
                seen.insert(column.name.as_str()),
                "Schema declares column '{}' more than once",
                column.name
            );
        }
        Ok(())
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<SemanticType> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.datatype)
    }

    /// Declared type for each header position, `None` where undeclared.
    pub fn projection_for(&self, headers: &[String]) -> Vec<Option<SemanticType>> {
        headers.iter().map(|header| self.get(header)).collect()
    }

    /// Declared columns that the header does not contain.
    pub fn unmatched_columns<'a>(&'a self, headers: &[String]) -> Vec<&'a str> {
        let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
        self.columns
            .iter()
            .map(|column| column.name.as_str())
            .filter(|name| !present.contains(name))
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: ColumnSchema =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        schema
            .validate()
            .with_context(|| format!("Validating schema file {path:?}"))?;
        Ok(schema)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing schema to YAML string")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn semantic_type_accepts_dtype_aliases() {
        assert_eq!("object".parse::<SemanticType>().unwrap(), SemanticType::Text);
        assert_eq!("int64".parse::<SemanticType>().unwrap(), SemanticType::Integer);
        assert_eq!("DOUBLE".parse::<SemanticType>().unwrap(), SemanticType::Float);
        assert!("decimal".parse::<SemanticType>().is_err());
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = ColumnSchema::from_pairs([
            ("id", SemanticType::Integer),
            ("id", SemanticType::Text),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn projection_follows_header_order_and_is_case_sensitive() {
        let schema = ColumnSchema::from_pairs([
            ("amount", SemanticType::Float),
            ("id", SemanticType::Integer),
        ])
        .unwrap();
        let projection = schema.projection_for(&headers(&["id", "Amount", "amount"]));
        assert_eq!(
            projection,
            vec![Some(SemanticType::Integer), None, Some(SemanticType::Float)]
        );
    }

    #[test]
    fn unmatched_columns_lists_declared_but_absent_names() {
        let schema = ColumnSchema::from_pairs([
            ("id", SemanticType::Integer),
            ("missing", SemanticType::Text),
        ])
        .unwrap();
        assert_eq!(schema.unmatched_columns(&headers(&["id"])), vec!["missing"]);
    }

    #[test]
    fn yaml_round_trip_preserves_declaration_order() {
        let schema = ColumnSchema::from_pairs([
            ("b", SemanticType::Text),
            ("a", SemanticType::Integer),
        ])
        .unwrap();
        let yaml = schema.to_yaml_string().unwrap();
        assert!(yaml.contains("datatype: Integer"));
        let parsed: ColumnSchema = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn load_rejects_schema_with_empty_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"columns:\n  - name: \"\"\n    datatype: str\n",
        )
        .unwrap();
        assert!(ColumnSchema::load(file.path()).is_err());
    }
}
