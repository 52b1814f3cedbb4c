//! METEK sonic3D field tables
//!
//! The anemometer streams four payload values per line, in this order:
//!
//! | Key | Publish name    | Unit            | Quantity            |
//! |-----|-----------------|-----------------|---------------------|
//! | U   | `sonic3d.uwind` | m/s             | zonal wind          |
//! | V   | `sonic3d.vwind` | m/s             | meridional wind     |
//! | W   | `sonic3d.wwind` | m/s             | vertical wind       |
//! | T   | `sonic3d.temp`  | degrees Celsius | ambient temperature |

use super::record::FieldMap;
use crate::publish::SensorMetadata;

/// Sensor label attached to every published field
pub const SENSOR: &str = "METEK-sonic3D";

/// (key, publish name, unit, description) in wire order
const FIELDS: [(&str, &str, &str, &str); 4] = [
    ("U", "sonic3d.uwind", "m/s", "zonal wind"),
    ("V", "sonic3d.vwind", "m/s", "meridional wind"),
    ("W", "sonic3d.wwind", "m/s", "vertical wind"),
    ("T", "sonic3d.temp", "degrees Celsius", "Ambient Temperature"),
];

/// Protocol keys mapped to publish names, in wire order
pub fn field_map() -> FieldMap {
    FieldMap::new(FIELDS.iter().map(|(key, name, _, _)| (*key, *name)))
}

/// Units and descriptions for every sonic3D publish name
pub fn metadata() -> SensorMetadata {
    FIELDS
        .iter()
        .fold(SensorMetadata::new(SENSOR), |meta, (_, name, unit, desc)| {
            meta.with_field(*name, *unit, *desc)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_cover_every_field() {
        let fields = field_map();
        let meta = metadata();

        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["U", "V", "W", "T"]);
        for (_, name) in fields.iter() {
            assert!(meta.unit(name).is_ok(), "no unit for {}", name);
            assert!(meta.description(name).is_ok(), "no description for {}", name);
        }
        assert_eq!(meta.unit("sonic3d.temp").unwrap(), "degrees Celsius");
        assert_eq!(meta.sensor(), "METEK-sonic3D");
    }
}
