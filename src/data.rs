use crate::schema::SemanticType;

/// A single field after coercion to its column's semantic type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Text(&'a str),
    Integer(i64),
    Float(f64),
}

/// Coerces a raw field to `ty`. Empty fields become [`Value::Null`];
/// `None` means the field is not convertible.
pub fn coerce(value: &str, ty: SemanticType) -> Option<Value<'_>> {
    if value.is_empty() {
        return Some(Value::Null);
    }
    match ty {
        SemanticType::Text => Some(Value::Text(value)),
        SemanticType::Integer => parse_integer(value).map(Value::Integer),
        SemanticType::Float => parse_float(value).map(Value::Float),
    }
}

/// Like [`coerce`], but numeric columns ignore one enclosing pair of double
/// quotes. Used when quote interpretation is disabled at the CSV layer.
pub fn coerce_literal(value: &str, ty: SemanticType) -> Option<Value<'_>> {
    match ty {
        SemanticType::Text => coerce(value, ty),
        SemanticType::Integer | SemanticType::Float => coerce(strip_enclosing_quotes(value), ty),
    }
}

pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

pub fn parse_float(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

pub fn strip_enclosing_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        value
    }
}

/// Tracks which numeric types a column's observed values still fit.
#[derive(Debug, Clone)]
pub struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
    non_empty: usize,
}

impl Default for TypeCandidate {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCandidate {
    pub fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            non_empty: 0,
        }
    }

    pub fn observe(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        self.non_empty += 1;
        if self.possible_integer && parse_integer(value).is_none() {
            self.possible_integer = false;
        }
        if self.possible_float && parse_float(value).is_none() {
            self.possible_float = false;
        }
    }

    pub fn decide(&self) -> SemanticType {
        if self.non_empty == 0 {
            SemanticType::Text
        } else if self.possible_integer {
            SemanticType::Integer
        } else if self.possible_float {
            SemanticType::Float
        } else {
            SemanticType::Text
        }
    }
}

pub fn infer_type<'a, I>(values: I) -> SemanticType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::new();
    for value in values {
        candidate.observe(value);
        if !candidate.possible_float {
            break;
        }
    }
    candidate.decide()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_treats_empty_as_null_for_every_type() {
        for ty in [SemanticType::Text, SemanticType::Integer, SemanticType::Float] {
            assert_eq!(coerce("", ty), Some(Value::Null));
        }
    }

    #[test]
    fn coerce_rejects_non_numeric_text() {
        assert_eq!(coerce("bad", SemanticType::Float), None);
        assert_eq!(coerce("10.5", SemanticType::Integer), None);
        assert_eq!(coerce(" 42 ", SemanticType::Integer), Some(Value::Integer(42)));
        assert_eq!(coerce("10.5", SemanticType::Float), Some(Value::Float(10.5)));
    }

    #[test]
    fn coerce_literal_ignores_quotes_only_for_numbers() {
        assert_eq!(
            coerce_literal("\"2023\"", SemanticType::Integer),
            Some(Value::Integer(2023))
        );
        assert_eq!(
            coerce_literal("\"Smith\"", SemanticType::Text),
            Some(Value::Text("\"Smith\""))
        );
        assert_eq!(coerce_literal("\"\"", SemanticType::Integer), Some(Value::Null));
    }

    #[test]
    fn infer_type_prefers_integer_then_float_then_text() {
        assert_eq!(infer_type(["1", "", "3"]), SemanticType::Integer);
        assert_eq!(infer_type(["1", "2.5"]), SemanticType::Float);
        assert_eq!(infer_type(["1", "x", "2.5"]), SemanticType::Text);
        assert_eq!(infer_type(["", ""]), SemanticType::Text);
    }
}
