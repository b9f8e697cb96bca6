use crate::errors::SchemaError;
use crate::models::{DecodedFields, ProductRecord, PRODUCT_COLUMNS};

/// Check the field count and build a record from the leading seven fields.
///
/// Only the count is checked. Prices and category ids are passed through as
/// text; the database is the judge of their content.
pub fn validate(
    fields: DecodedFields,
    expected_count: usize,
    line_index: usize,
) -> Result<ProductRecord, SchemaError> {
    // A configured count below the table width can never produce a full record
    let required = expected_count.max(PRODUCT_COLUMNS.len());
    if fields.len() != expected_count || fields.len() < required {
        return Err(SchemaError {
            line_index,
            actual_count: fields.len(),
            expected_count,
        });
    }

    let mut values = fields.into_iter();
    let mut next = || values.next().unwrap_or_default();
    Ok(ProductRecord {
        name: next(),
        gender: next(),
        description: next(),
        photo: next(),
        category_id: next(),
        subcategory_id: next(),
        price: next(),
    })
}
