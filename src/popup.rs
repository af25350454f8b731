//! Render-ready content for district popups and the selection detail panel.
//!
//! Everything that reaches the screen passes through [`PriceFormatter`]
//! here, so the UI layer only lays out strings.

use crate::district::{District, PriceSummary, Transaction, TypeBreakdown};
use crate::format::PriceFormatter;
use crate::geo::LngLat;

/// Message shown instead of an empty per-type table
pub const NO_PROPERTIES: &str = "No properties available";

/// Formatted (min, avg, max) triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRange {
    pub min: String,
    pub avg: String,
    pub max: String,
}

/// One property type's line in a per-transaction table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRow {
    pub label: String,
    pub count: u64,
    pub range: PriceRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTable {
    Rows(Vec<TypeRow>),
    NoProperties,
}

impl TypeTable {
    fn build(rows: &[TypeBreakdown], tx: Transaction, fmt: &PriceFormatter) -> Self {
        let rows: Vec<TypeRow> = rows
            .iter()
            .filter(|row| row.count(tx) > 0)
            .map(|row| {
                let [min, avg, max] = row.prices(tx);
                TypeRow {
                    label: row.label.clone(),
                    count: row.count(tx),
                    range: PriceRange {
                        min: fmt.format(min),
                        avg: fmt.format(avg),
                        max: fmt.format(max),
                    },
                }
            })
            .collect();

        if rows.is_empty() {
            TypeTable::NoProperties
        } else {
            TypeTable::Rows(rows)
        }
    }
}

/// Per-type tables for districts supplied with a breakdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown {
    pub rental: TypeTable,
    pub sale: TypeTable,
}

impl Breakdown {
    pub fn table(&self, tx: Transaction) -> &TypeTable {
        match tx {
            Transaction::Rental => &self.rental,
            Transaction::Sale => &self.sale,
        }
    }
}

/// Everything a popup or detail panel shows for one district
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub title: String,
    pub commune: Option<String>,
    pub rental: PriceRange,
    pub sale: PriceRange,
    pub property_count: Option<String>,
    pub breakdown: Option<Breakdown>,
}

impl PopupContent {
    pub fn build(district: &District, fmt: &PriceFormatter) -> Self {
        let title = if district.name.trim().is_empty() {
            "Unnamed district".to_string()
        } else {
            district.name.clone()
        };

        match &district.prices {
            PriceSummary::Flat(flat) => Self {
                title,
                commune: district.commune.clone(),
                rental: PriceRange {
                    min: fmt.format(flat.rental_min.as_ref()),
                    avg: fmt.format(flat.rental_avg.as_ref()),
                    max: fmt.format(flat.rental_max.as_ref()),
                },
                sale: PriceRange {
                    min: fmt.format(flat.sale_min.as_ref()),
                    avg: fmt.format(flat.sale_avg.as_ref()),
                    max: fmt.format(flat.sale_max.as_ref()),
                },
                property_count: flat.property_count.as_ref().map(|c| fmt.format(Some(c))),
                breakdown: None,
            },
            PriceSummary::Breakdown(rows) => {
                let total = rows.iter().fold(0u64, |acc, r| {
                    acc.saturating_add(r.rental_count).saturating_add(r.sale_count)
                });
                Self {
                    title,
                    commune: district.commune.clone(),
                    rental: aggregate(rows, Transaction::Rental, fmt),
                    sale: aggregate(rows, Transaction::Sale, fmt),
                    property_count: Some(fmt.format_amount(total as f64)),
                    breakdown: Some(Breakdown {
                        rental: TypeTable::build(rows, Transaction::Rental, fmt),
                        sale: TypeTable::build(rows, Transaction::Sale, fmt),
                    }),
                }
            }
        }
    }

    /// Compact text used by the hover popup
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(4);
        if let Some(commune) = &self.commune {
            lines.push(commune.clone());
        }
        lines.push(format!(
            "Rent  {} / {} / {}",
            self.rental.min, self.rental.avg, self.rental.max
        ));
        lines.push(format!(
            "Sale  {} / {} / {}",
            self.sale.min, self.sale.avg, self.sale.max
        ));
        if let Some(count) = &self.property_count {
            lines.push(format!("Properties  {count}"));
        }
        lines
    }
}

/// Range across breakdown rows that have listings for `tx`.
/// Averages are weighted by listing count.
fn aggregate(rows: &[TypeBreakdown], tx: Transaction, fmt: &PriceFormatter) -> PriceRange {
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    let mut weighted = 0.0;
    let mut weight = 0.0;

    for row in rows.iter().filter(|r| r.count(tx) > 0) {
        let [row_min, row_avg, row_max] = row.prices(tx).map(|v| v.and_then(|s| s.as_f64()));
        if let Some(v) = row_min.filter(|v| *v > 0.0) {
            min = Some(min.map_or(v, |m| m.min(v)));
        }
        if let Some(v) = row_max.filter(|v| *v > 0.0) {
            max = Some(max.map_or(v, |m| m.max(v)));
        }
        if let Some(v) = row_avg.filter(|v| *v > 0.0) {
            let w = row.count(tx) as f64;
            weighted += v * w;
            weight += w;
        }
    }

    let avg = (weight > 0.0).then(|| weighted / weight);
    let render = |v: Option<f64>| v.map_or_else(|| crate::format::DASH.to_string(), |n| fmt.format_amount(n));
    PriceRange {
        min: render(min),
        avg: render(avg),
        max: render(max),
    }
}

/// View model for the selection detail panel
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub district_id: String,
    pub coordinate: Option<LngLat>,
    pub content: PopupContent,
}

impl DetailView {
    /// `None` when nothing is selected
    pub fn from_selection(selection: Option<&District>, fmt: &PriceFormatter) -> Option<Self> {
        let district = selection?;
        Some(Self {
            district_id: district.id.clone(),
            coordinate: district.coordinate(),
            content: PopupContent::build(district, fmt),
        })
    }
}
