use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gram_options::GramOptions;
use super::model::AlignModel;
use super::prob_table::ProbTable;
use super::ModelError;

pub(crate) const MAGIC: &[u8; 4] = b"G2PA";
pub(crate) const VERSION: u8 = 1;
/// magic + version + crc32
const HEADER_LEN: usize = 9;

#[derive(Serialize, Deserialize)]
struct TableData {
    floor: f64,
    entries: Vec<(String, String, f64)>,
}

#[derive(Serialize, Deserialize)]
struct ModelData {
    options: GramOptions,
    table: TableData,
}

impl AlignModel {
    /// Serialize to bytes (G2PA format). Entries are sorted so equal models
    /// encode identically.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let table = self.transitions();
        let data = ModelData {
            options: self.gram_options().clone(),
            table: TableData {
                floor: table.floor(),
                entries: table
                    .sorted_entries()
                    .into_iter()
                    .map(|(x, y, p)| (x.to_string(), y.to_string(), p))
                    .collect(),
            },
        };
        let body = bincode::serialize(&data).map_err(ModelError::Serialize)?;
        let crc = crc32fast::hash(&body);

        let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize from bytes (G2PA format), validating header, checksum,
    /// options and table values. The penalizer and search engines are
    /// rebuilt from the decoded options.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        if bytes.len() < HEADER_LEN {
            return Err(ModelError::InvalidHeader);
        }
        if &bytes[0..4] != MAGIC {
            return Err(ModelError::InvalidMagic);
        }
        if bytes[4] != VERSION {
            return Err(ModelError::UnsupportedVersion(bytes[4]));
        }
        let expected_crc = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
        let body = &bytes[HEADER_LEN..];
        if crc32fast::hash(body) != expected_crc {
            return Err(ModelError::ChecksumMismatch);
        }

        let data: ModelData = bincode::deserialize(body).map_err(ModelError::Deserialize)?;
        data.options.validate()?;

        let floor = data.table.floor;
        if !(floor > 0.0 && floor < 1.0) {
            return Err(ModelError::InvalidTable(format!(
                "floor probability {floor} outside (0, 1)"
            )));
        }
        if let Some((x, y, p)) = data
            .table
            .entries
            .iter()
            .find(|(_, _, p)| !p.is_finite() || *p < 0.0)
        {
            return Err(ModelError::InvalidTable(format!(
                "invalid probability {p} for ({x:?}, {y:?})"
            )));
        }

        debug!(entries = data.table.entries.len(), "model decoded");
        let table = ProbTable::from_entries(floor, data.table.entries);
        Ok(Self::new(data.options, table))
    }

    /// Atomic write: write to .tmp then rename.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn open(path: &Path) -> Result<Self, ModelError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::GramOptionsError;

    fn encode(data: &ModelData) -> Vec<u8> {
        let body = bincode::serialize(data).unwrap();
        let mut buf = MAGIC.to_vec();
        buf.push(VERSION);
        buf.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        buf.extend_from_slice(&body);
        buf
    }

    fn options() -> GramOptions {
        GramOptions::new(1, 2, 1, 1).unwrap()
    }

    #[test]
    fn decodes_valid_body() {
        let data = ModelData {
            options: options(),
            table: TableData {
                floor: 1e-8,
                entries: vec![("C".into(), "K".into(), 1.0)],
            },
        };
        let model = AlignModel::from_bytes(&encode(&data)).unwrap();
        assert_eq!(model.transitions().floor(), 1e-8);
        assert_eq!(model.transitions().lookup("C", "K"), 1.0);
        assert_eq!(model.transitions().lookup("C", "S"), 1e-8);
    }

    #[test]
    fn rejects_negative_probability() {
        let data = ModelData {
            options: options(),
            table: TableData {
                floor: 1e-10,
                entries: vec![("C".into(), "K".into(), -0.5)],
            },
        };
        let err = AlignModel::from_bytes(&encode(&data)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTable(_)));
        assert!(err.to_string().contains("-0.5"));
    }

    #[test]
    fn rejects_floor_outside_unit_interval() {
        for floor in [0.0, 1.0, f64::NAN] {
            let data = ModelData {
                options: options(),
                table: TableData {
                    floor,
                    entries: Vec::new(),
                },
            };
            assert!(matches!(
                AlignModel::from_bytes(&encode(&data)),
                Err(ModelError::InvalidTable(_))
            ));
        }
    }

    #[test]
    fn rejects_inverted_options() {
        let inverted: GramOptions = toml::from_str(
            r#"
min_x_gram = 3
max_x_gram = 2
min_y_gram = 1
max_y_gram = 1
include_x_epsilons = false
include_epsilon_ys = false
only_one_grams = false
city_block_penalty = false
"#,
        )
        .unwrap();
        let data = ModelData {
            options: inverted,
            table: TableData {
                floor: 1e-10,
                entries: Vec::new(),
            },
        };
        assert!(matches!(
            AlignModel::from_bytes(&encode(&data)),
            Err(ModelError::InvalidOptions(GramOptionsError::InvertedBounds { .. }))
        ));
    }
}
