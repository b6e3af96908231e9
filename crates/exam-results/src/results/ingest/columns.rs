use std::collections::HashMap;

use super::super::domain::{ComponentKey, Subject, SubjectId};
use super::super::errors::StructuralError;

pub const REG_NUMBER_COLUMN: &str = "regNumber";

/// Where each expected value lives in an upload.
#[derive(Debug, Clone)]
pub(crate) struct ColumnLayout {
    pub(crate) reg_number: usize,
    pub(crate) subjects: Vec<SubjectColumns>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubjectColumns {
    pub(crate) subject: SubjectId,
    pub(crate) columns: Vec<InputColumn>,
}

#[derive(Debug, Clone)]
pub(crate) struct InputColumn {
    pub(crate) component: ComponentKey,
    pub(crate) name: String,
    pub(crate) index: usize,
}

pub fn column_name(subject_code: &str, component: &ComponentKey) -> String {
    format!("{subject_code}_{component}")
}

/// `regNumber` followed by `CODE_key` for every input component, in batch and scheme order.
pub fn expected_headers(subjects: &[Subject]) -> Vec<String> {
    let mut headers = vec![REG_NUMBER_COLUMN.to_string()];
    for subject in subjects {
        for component in subject.scheme.input_components() {
            headers.push(column_name(&subject.code, &component.key));
        }
    }
    headers
}

impl ColumnLayout {
    /// Map the upload header onto the batch. Every missing column is reported at once; extra
    /// columns are returned so callers can log them.
    pub(crate) fn resolve(
        headers: &[String],
        subjects: &[Subject],
    ) -> Result<(Self, Vec<String>), StructuralError> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            positions.entry(normalize_header(header)).or_insert(index);
        }

        let mut missing = Vec::new();
        let mut used = vec![false; headers.len()];
        let mut locate = |name: &str| -> Option<usize> {
            match positions.get(&normalize_header(name)) {
                Some(index) => {
                    used[*index] = true;
                    Some(*index)
                }
                None => {
                    missing.push(name.to_string());
                    None
                }
            }
        };

        let reg_number = locate(REG_NUMBER_COLUMN);
        let mut subject_columns = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let mut columns = Vec::new();
            for component in subject.scheme.input_components() {
                let name = column_name(&subject.code, &component.key);
                if let Some(index) = locate(&name) {
                    columns.push(InputColumn {
                        component: component.key.clone(),
                        name,
                        index,
                    });
                }
            }
            subject_columns.push(SubjectColumns {
                subject: subject.id.clone(),
                columns,
            });
        }

        let reg_number = match reg_number {
            Some(index) if missing.is_empty() => index,
            _ => return Err(StructuralError::MissingColumns(missing)),
        };

        let extra = headers
            .iter()
            .zip(used)
            .filter(|(_, used)| !used)
            .map(|(header, _)| header.clone())
            .collect();

        Ok((
            Self {
                reg_number,
                subjects: subject_columns,
            },
            extra,
        ))
    }
}

pub(crate) fn normalize_header(value: &str) -> String {
    value
        .replace(['\u{feff}', '\u{200b}'], "")
        .trim()
        .to_ascii_lowercase()
}
