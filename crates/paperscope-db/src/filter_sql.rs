//! Translation of [`MetadataFilter`] into parameterized SQL.
//!
//! Only whitelisted metadata fields can be referenced; anything else is
//! rejected before a query is built, so field names never reach SQL text
//! from user input.

use paperscope_core::{Error, MetadataFilter, Result};

/// Type-safe parameter binding for SQL queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// 64-bit integer parameter.
    BigInt(i64),
}

/// Column backing a filterable metadata field.
fn column_for(field: &str) -> Option<&'static str> {
    match field {
        "year" => Some("p.year"),
        _ => None,
    }
}

/// Generates a SQL WHERE fragment for a metadata filter.
///
/// ```
/// use paperscope_core::MetadataFilter;
/// use paperscope_db::filter_sql::{MetadataFilterQueryBuilder, QueryParam};
///
/// let filter = MetadataFilter::and(vec![
///     MetadataFilter::gte("year", 2020),
///     MetadataFilter::lt("year", 2023),
/// ]);
/// let (sql, params) = MetadataFilterQueryBuilder::new(&filter, 2).build().unwrap();
/// assert_eq!(sql, "(p.year >= $3 AND p.year < $4)");
/// assert_eq!(params, vec![QueryParam::BigInt(2020), QueryParam::BigInt(2023)]);
/// ```
pub struct MetadataFilterQueryBuilder<'a> {
    filter: &'a MetadataFilter,
    param_offset: usize,
}

impl<'a> MetadataFilterQueryBuilder<'a> {
    /// `param_offset` is the number of parameters already bound in the query.
    pub fn new(filter: &'a MetadataFilter, param_offset: usize) -> Self {
        Self {
            filter,
            param_offset,
        }
    }

    /// Build the fragment and its parameters in binding order.
    pub fn build(&self) -> Result<(String, Vec<QueryParam>)> {
        let mut params = Vec::new();
        let mut idx = self.param_offset;
        let sql = Self::clause(self.filter, &mut idx, &mut params)?;
        Ok((sql, params))
    }

    fn clause(
        filter: &MetadataFilter,
        idx: &mut usize,
        params: &mut Vec<QueryParam>,
    ) -> Result<String> {
        match filter {
            MetadataFilter::Gte { field, value } => {
                Self::comparison(field, ">=", *value, idx, params)
            }
            MetadataFilter::Lt { field, value } => Self::comparison(field, "<", *value, idx, params),
            MetadataFilter::And(inner) => {
                if inner.is_empty() {
                    return Ok("TRUE".to_string());
                }
                let parts = inner
                    .iter()
                    .map(|f| Self::clause(f, idx, params))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", parts.join(" AND ")))
            }
        }
    }

    fn comparison(
        field: &str,
        op: &str,
        value: i64,
        idx: &mut usize,
        params: &mut Vec<QueryParam>,
    ) -> Result<String> {
        let column = column_for(field)
            .ok_or_else(|| Error::InvalidInput(format!("Unsupported filter field: {}", field)))?;
        *idx += 1;
        params.push(QueryParam::BigInt(value));
        Ok(format!("{} {} ${}", column, op, idx))
    }
}
