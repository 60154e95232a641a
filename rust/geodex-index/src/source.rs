//! The feature-source interface the builder iterates over.

use geodex_common::Result;
use geodex_format::coding::PointU;
use geodex_format::features::{FeatureCollection, SourceHeader};

/// A borrowed view of one feature during the build pass.
#[derive(Debug, Copy, Clone)]
pub struct FeatureRef<'a> {
    /// Stable 0-based index into the source.
    pub index: u32,
    /// Raw category type codes, decoded by the type layer.
    pub type_codes: &'a [u32],
    /// (language tag, raw name text) pairs.
    pub names: &'a [(i8, String)],
    pub population: u64,
    pub center: PointU,
}

impl<'a> FeatureRef<'a> {
    /// Invokes `f` for every (language, raw name) pair; stops early when `f`
    /// returns `false`.
    pub fn for_each_name<F: FnMut(i8, &str) -> bool>(&self, mut f: F) {
        for (lang, name) in self.names {
            if !f(*lang, name) {
                return;
            }
        }
    }
}

/// Sequential, read-only access to an immutable feature collection with
/// stable 0-based indices.
pub trait FeatureSource {
    fn header(&self) -> &SourceHeader;

    fn feature_count(&self) -> u32;

    /// Visits features strictly in index order.
    fn for_each_feature(&self, f: &mut dyn FnMut(FeatureRef<'_>) -> Result<()>) -> Result<()>;
}

impl FeatureSource for FeatureCollection {
    fn header(&self) -> &SourceHeader {
        FeatureCollection::header(self)
    }

    fn feature_count(&self) -> u32 {
        self.len() as u32
    }

    fn for_each_feature(&self, f: &mut dyn FnMut(FeatureRef<'_>) -> Result<()>) -> Result<()> {
        for (index, record) in self.features().iter().enumerate() {
            f(FeatureRef {
                index: index as u32,
                type_codes: &record.type_codes,
                names: &record.names,
                population: record.population,
                center: record.center,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodex_format::coding::CodingParams;
    use geodex_format::features::{FeatureRecord, ScaleRange, Scope};

    #[test]
    fn test_collection_iteration_order() {
        let header = SourceHeader {
            scope: Scope::Region,
            coding: CodingParams::new(32, PointU::default()).unwrap(),
            scale_range: ScaleRange::new(0, 17),
        };
        let collection = FeatureCollection::new(
            header,
            vec![
                FeatureRecord {
                    type_codes: vec![],
                    names: vec![(1, "a".into())],
                    population: 0,
                    center: PointU::default(),
                },
                FeatureRecord {
                    type_codes: vec![],
                    names: vec![(1, "b".into())],
                    population: 0,
                    center: PointU::default(),
                },
            ],
        );

        let mut seen = Vec::new();
        collection
            .for_each_feature(&mut |f| {
                seen.push((f.index, f.names[0].1.clone()));
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![(0, "a".to_string()), (1, "b".to_string())]);
    }

    #[test]
    fn test_for_each_name_early_stop() {
        let names = vec![(1i8, "one".to_string()), (2, "two".to_string())];
        let feature = FeatureRef {
            index: 0,
            type_codes: &[],
            names: &names,
            population: 0,
            center: PointU::default(),
        };
        let mut seen = 0;
        feature.for_each_name(|_, _| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
    }
}
