//! District ("quartier") records as supplied by the location-data service.
//!
//! Records arrive with loosely typed fields: numbers may be strings,
//! coordinates may be missing, and the price summary comes in one of two
//! shapes depending on which endpoint produced it. Everything here is
//! tolerant on input and explicit on output: [`District::coordinate`]
//! either yields a usable point or `None`, and [`PriceSummary`] names the
//! shape that was received.

use serde::Deserialize;

use crate::geo::LngLat;

/// A loosely typed value: either a JSON number or a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric value, if any.
    ///
    /// Text is trimmed and stripped of whitespace (including no-break
    /// spaces used as thousands separators); a decimal comma is accepted.
    /// Placeholders such as `""` and `"-"` and non-finite values yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.is_finite().then_some(*n),
            Scalar::Text(text) => {
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                if compact.is_empty() || compact == "-" {
                    return None;
                }
                compact
                    .parse::<f64>()
                    .ok()
                    .or_else(|| compact.replace(',', ".").parse::<f64>().ok())
                    .filter(|v| v.is_finite())
            }
        }
    }

    /// Text rendering used for identifiers
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(t) => t.clone(),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Flat price fields attached directly to the district
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatPrices {
    pub rental_min: Option<Scalar>,
    pub rental_avg: Option<Scalar>,
    pub rental_max: Option<Scalar>,
    pub sale_min: Option<Scalar>,
    pub sale_avg: Option<Scalar>,
    pub sale_max: Option<Scalar>,
    pub property_count: Option<Scalar>,
}

/// Prices for one property type inside a district
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeBreakdown {
    pub label: String,
    pub rental_min: Option<Scalar>,
    pub rental_avg: Option<Scalar>,
    pub rental_max: Option<Scalar>,
    pub sale_min: Option<Scalar>,
    pub sale_avg: Option<Scalar>,
    pub sale_max: Option<Scalar>,
    pub rental_count: u64,
    pub sale_count: u64,
}

/// Which transaction a price or count refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Rental,
    Sale,
}

impl TypeBreakdown {
    pub fn count(&self, tx: Transaction) -> u64 {
        match tx {
            Transaction::Rental => self.rental_count,
            Transaction::Sale => self.sale_count,
        }
    }

    /// (min, avg, max) for one transaction type
    pub fn prices(&self, tx: Transaction) -> [Option<&Scalar>; 3] {
        match tx {
            Transaction::Rental => [
                self.rental_min.as_ref(),
                self.rental_avg.as_ref(),
                self.rental_max.as_ref(),
            ],
            Transaction::Sale => [
                self.sale_min.as_ref(),
                self.sale_avg.as_ref(),
                self.sale_max.as_ref(),
            ],
        }
    }
}

/// The two price-summary shapes different pages supply
#[derive(Debug, Clone, PartialEq)]
pub enum PriceSummary {
    Flat(FlatPrices),
    Breakdown(Vec<TypeBreakdown>),
}

impl Default for PriceSummary {
    fn default() -> Self {
        PriceSummary::Flat(FlatPrices::default())
    }
}

/// A named district with coordinates and price statistics
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawDistrict")]
pub struct District {
    pub id: String,
    pub name: String,
    pub commune: Option<String>,
    pub latitude: Option<Scalar>,
    pub longitude: Option<Scalar>,
    pub prices: PriceSummary,
}

impl District {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            commune: None,
            latitude: None,
            longitude: None,
            prices: PriceSummary::default(),
        }
    }

    pub fn with_position(mut self, lat: impl Into<Scalar>, lng: impl Into<Scalar>) -> Self {
        self.latitude = Some(lat.into());
        self.longitude = Some(lng.into());
        self
    }

    pub fn with_commune(mut self, commune: impl Into<String>) -> Self {
        self.commune = Some(commune.into());
        self
    }

    pub fn with_prices(mut self, prices: PriceSummary) -> Self {
        self.prices = prices;
        self
    }

    /// Normalized coordinate, `None` when either part is missing or unusable
    pub fn coordinate(&self) -> Option<LngLat> {
        let lat = self.latitude.as_ref()?.as_f64()?;
        let lng = self.longitude.as_ref()?.as_f64()?;
        LngLat::checked(lng, lat)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommuneField {
    Name(String),
    Object {
        #[serde(alias = "name")]
        nom: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawTypeRow {
    #[serde(alias = "type", alias = "categorie", default)]
    label: Option<String>,
    #[serde(alias = "rental_min", default)]
    prix_min_location: Option<Scalar>,
    #[serde(alias = "rental_avg", default)]
    prix_moyen_location: Option<Scalar>,
    #[serde(alias = "rental_max", default)]
    prix_max_location: Option<Scalar>,
    #[serde(alias = "sale_min", default)]
    prix_min_vente: Option<Scalar>,
    #[serde(alias = "sale_avg", default)]
    prix_moyen_vente: Option<Scalar>,
    #[serde(alias = "sale_max", default)]
    prix_max_vente: Option<Scalar>,
    #[serde(alias = "rental_count", default)]
    nombre_location: Option<Scalar>,
    #[serde(alias = "sale_count", default)]
    nombre_vente: Option<Scalar>,
}

/// Wire shape of a district record; French keys with English aliases
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDistrict {
    #[serde(default)]
    id: Option<Scalar>,
    #[serde(alias = "name", default)]
    nom: Option<String>,
    #[serde(default)]
    commune: Option<CommuneField>,
    #[serde(alias = "lat", default)]
    latitude: Option<Scalar>,
    #[serde(alias = "lng", alias = "lon", default)]
    longitude: Option<Scalar>,
    #[serde(alias = "rental_min", default)]
    prix_min_location: Option<Scalar>,
    #[serde(alias = "rental_max", default)]
    prix_max_location: Option<Scalar>,
    #[serde(alias = "rental_avg", default)]
    prix_moyen_location: Option<Scalar>,
    #[serde(alias = "sale_min", default)]
    prix_min_vente: Option<Scalar>,
    #[serde(alias = "sale_max", default)]
    prix_max_vente: Option<Scalar>,
    #[serde(alias = "sale_avg", default)]
    prix_moyen_vente: Option<Scalar>,
    #[serde(alias = "property_count", default)]
    nombre_biens: Option<Scalar>,
    #[serde(alias = "breakdown", default)]
    prix: Option<Vec<RawTypeRow>>,
}

impl RawDistrict {
    /// Fill coordinates from an external geometry when the record has none
    pub(crate) fn place_if_missing(&mut self, lng: f64, lat: f64) {
        if self.latitude.is_none() && self.longitude.is_none() {
            self.latitude = Some(Scalar::Number(lat));
            self.longitude = Some(Scalar::Number(lng));
        }
    }
}

fn count(value: Option<Scalar>) -> u64 {
    value
        .and_then(|v| v.as_f64())
        .filter(|n| *n > 0.0)
        .map(|n| n.round() as u64)
        .unwrap_or(0)
}

impl From<RawTypeRow> for TypeBreakdown {
    fn from(raw: RawTypeRow) -> Self {
        Self {
            label: raw.label.unwrap_or_else(|| "-".to_string()),
            rental_min: raw.prix_min_location,
            rental_avg: raw.prix_moyen_location,
            rental_max: raw.prix_max_location,
            sale_min: raw.prix_min_vente,
            sale_avg: raw.prix_moyen_vente,
            sale_max: raw.prix_max_vente,
            rental_count: count(raw.nombre_location),
            sale_count: count(raw.nombre_vente),
        }
    }
}

impl From<RawDistrict> for District {
    fn from(raw: RawDistrict) -> Self {
        let prices = match raw.prix {
            Some(rows) => PriceSummary::Breakdown(rows.into_iter().map(TypeBreakdown::from).collect()),
            None => PriceSummary::Flat(FlatPrices {
                rental_min: raw.prix_min_location,
                rental_avg: raw.prix_moyen_location,
                rental_max: raw.prix_max_location,
                sale_min: raw.prix_min_vente,
                sale_avg: raw.prix_moyen_vente,
                sale_max: raw.prix_max_vente,
                property_count: raw.nombre_biens,
            }),
        };

        let commune = raw.commune.and_then(|c| match c {
            CommuneField::Name(name) => Some(name),
            CommuneField::Object { nom } => nom,
        });

        Self {
            id: raw.id.map(|id| id.to_text()).unwrap_or_default(),
            name: raw.nom.unwrap_or_default(),
            commune,
            latitude: raw.latitude,
            longitude: raw.longitude,
            prices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_parsing() {
        assert_eq!(Scalar::from(1234.0).as_f64(), Some(1234.0));
        assert_eq!(Scalar::from("12 345").as_f64(), Some(12345.0));
        assert_eq!(Scalar::from("12\u{a0}345").as_f64(), Some(12345.0));
        assert_eq!(Scalar::from("5,36").as_f64(), Some(5.36));
        assert_eq!(Scalar::from("-").as_f64(), None);
        assert_eq!(Scalar::from("").as_f64(), None);
        assert_eq!(Scalar::from("abc").as_f64(), None);
        assert_eq!(Scalar::from(f64::NAN).as_f64(), None);
    }

    #[test]
    fn test_coordinate_from_strings() {
        let d = District::new("1", "Cocody").with_position("5.36", "-4.00");
        let c = d.coordinate().unwrap();
        assert_eq!(c.lat, 5.36);
        assert_eq!(c.lng, -4.0);
    }

    #[test]
    fn test_coordinate_missing_or_invalid() {
        assert!(District::new("1", "A").coordinate().is_none());
        assert!(District::new("2", "B").with_position("x", 1.0).coordinate().is_none());
        assert!(District::new("3", "C").with_position(f64::NAN, 1.0).coordinate().is_none());
        assert!(District::new("4", "D").with_position(120.0, 1.0).coordinate().is_none());
    }

    #[test]
    fn test_breakdown_counts_from_raw() {
        let raw = RawDistrict {
            nom: Some("Riviera".into()),
            prix: Some(vec![RawTypeRow {
                label: Some("Villa".into()),
                nombre_location: Some(Scalar::from("3")),
                nombre_vente: Some(Scalar::from(-2.0)),
                ..Default::default()
            }]),
            ..Default::default()
        };
        let d = District::from(raw);
        match d.prices {
            PriceSummary::Breakdown(rows) => {
                assert_eq!(rows[0].rental_count, 3);
                assert_eq!(rows[0].sale_count, 0);
            }
            PriceSummary::Flat(_) => panic!("expected breakdown"),
        }
    }

    #[test]
    fn test_empty_breakdown_stays_breakdown() {
        let raw = RawDistrict {
            prix: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(District::from(raw).prices, PriceSummary::Breakdown(Vec::new()));
    }

    #[test]
    fn test_numeric_id_to_text() {
        let raw = RawDistrict {
            id: Some(Scalar::Number(42.0)),
            ..Default::default()
        };
        assert_eq!(District::from(raw).id, "42");
    }
}
