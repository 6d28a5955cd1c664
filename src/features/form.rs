use crate::features::costs::{self, MATERIAL_ROWS};
use std::collections::{BTreeMap, HashMap};

pub const JOB_NAME: &str = "jobName";
pub const DATE_ORDERED: &str = "dateOrdered";
pub const SIGNATURE_DATE: &str = "signatureDate";

/// Field kinds drive both input rendering and PDF labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Number,
    Multiline,
    Derived,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

const fn field(key: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { key, label, kind }
}

pub const JOB_FIELDS: [FieldSpec; 5] = [
    field(JOB_NAME, "Job Name", FieldKind::Text),
    field("customerName", "Customer", FieldKind::Text),
    field("jobAddress", "Address", FieldKind::Text),
    field("phone", "Phone", FieldKind::Text),
    field(DATE_ORDERED, "Date Ordered", FieldKind::Date),
];

pub const COST_FIELDS: [FieldSpec; 10] = [
    field(costs::TOTAL_MATERIAL, "Total Material", FieldKind::Derived),
    field(costs::LABOR, "Labor", FieldKind::Number),
    field(costs::INSURANCE, "W/C Insurance", FieldKind::Number),
    field(costs::DISPOSAL, "Tear Off / Dump", FieldKind::Number),
    field(costs::COMMISSION, "Commission", FieldKind::Number),
    field(costs::TOTAL_COST, "Total Cost", FieldKind::Derived),
    field(costs::CONTRACT_PRICE, "Contract Price", FieldKind::Number),
    field(costs::OVERHEAD, "Overhead", FieldKind::Number),
    field(costs::GROSS_PROFIT, "Gross Profit %", FieldKind::Derived),
    field(costs::NET_PROFIT, "Net Profit", FieldKind::Derived),
];

pub const CLOSING_FIELDS: [FieldSpec; 3] = [
    field("notes", "Notes", FieldKind::Multiline),
    field("signatureName", "Printed Name", FieldKind::Text),
    field(SIGNATURE_DATE, "Date", FieldKind::Date),
];

pub fn material_key(row: usize) -> String {
    format!("material{row}")
}

/// What a field write should trigger in the cost engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recalc {
    None,
    Row(usize),
    Summary,
}

pub fn is_derived(key: &str) -> bool {
    if COST_FIELDS
        .iter()
        .any(|f| f.kind == FieldKind::Derived && f.key == key)
    {
        return true;
    }
    key.strip_prefix("total")
        .and_then(|n| n.parse::<usize>().ok())
        .is_some_and(|row| (1..=MATERIAL_ROWS).contains(&row))
}

pub fn recalc_for(key: &str) -> Recalc {
    let row_of = |prefix: &str| {
        key.strip_prefix(prefix)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|row| (1..=MATERIAL_ROWS).contains(row))
    };
    if let Some(row) = row_of("qty").or_else(|| row_of("price")) {
        return Recalc::Row(row);
    }
    if costs::SUMMARY_INPUTS.contains(&key) {
        return Recalc::Summary;
    }
    Recalc::None
}

/// Current value of every form field, keyed by the browser field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields {
    values: BTreeMap<String, String>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing fields read as empty, like a blank input.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// Store a user-entered value without triggering recalculation.
    pub fn set_raw(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub(crate) fn set_derived(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    /// Apply one input-change event and run the recalculation it implies.
    /// Writes to derived fields are ignored.
    pub fn set_field(&mut self, key: &str, value: &str) -> Recalc {
        if is_derived(key) {
            return Recalc::None;
        }
        self.set_raw(key, value);
        let recalc = recalc_for(key);
        match recalc {
            Recalc::Row(row) => {
                costs::recompute_row(self, row);
            }
            Recalc::Summary => {
                costs::recompute_summary(self);
            }
            Recalc::None => {}
        }
        recalc
    }

    /// Apply a batch of bindings, then recompute everything once.
    pub fn sync(&mut self, bindings: &HashMap<String, String>) {
        for (key, value) in bindings {
            if !is_derived(key) {
                self.set_raw(key, value);
            }
        }
        costs::recompute_all(self);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Fill both date fields with `today` (`YYYY-MM-DD`).
    pub fn apply_default_dates(&mut self, today: &str) {
        self.set_raw(DATE_ORDERED, today);
        self.set_raw(SIGNATURE_DATE, today);
    }
}

pub fn today_iso() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_distinguishes_rows_summary_and_text() {
        assert_eq!(recalc_for("qty3"), Recalc::Row(3));
        assert_eq!(recalc_for("price6"), Recalc::Row(6));
        assert_eq!(recalc_for("qty7"), Recalc::None);
        assert_eq!(recalc_for("qty0"), Recalc::None);
        assert_eq!(recalc_for("contractPrice"), Recalc::Summary);
        assert_eq!(recalc_for("jobName"), Recalc::None);
    }

    #[test]
    fn derived_fields_reject_writes() {
        let mut fields = FormFields::new();
        fields.set_field("qty1", "2");
        fields.set_field("price1", "5");
        assert_eq!(fields.get("total1"), "$10.00");

        assert_eq!(fields.set_field("total1", "$999.00"), Recalc::None);
        assert_eq!(fields.get("total1"), "$10.00");
        assert_eq!(fields.set_field("netProfit", "1"), Recalc::None);
        assert_eq!(fields.get("netProfit"), "");
    }

    #[test]
    fn input_change_updates_summary_eagerly() {
        let mut fields = FormFields::new();
        fields.set_field("qty1", "10");
        fields.set_field("price1", "20");
        assert_eq!(fields.get("totalMaterial"), "$200.00");
        assert_eq!(fields.get("totalCost"), "$200.00");

        fields.set_field("labor", "100");
        assert_eq!(fields.get("totalCost"), "$300.00");

        fields.set_field("contractPrice", "600");
        assert_eq!(fields.get("grossProfit"), "50.0%");
        assert_eq!(fields.get("netProfit"), "$300.00");
    }

    #[test]
    fn sync_applies_batch_and_recomputes() {
        let mut fields = FormFields::new();
        let bindings: HashMap<String, String> = [
            ("qty2", "4"),
            ("price2", "2.5"),
            ("jobName", "Smith Roof"),
            ("total2", "$1.00"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        fields.sync(&bindings);
        assert_eq!(fields.get("total2"), "$10.00");
        assert_eq!(fields.get("jobName"), "Smith Roof");
    }

    #[test]
    fn default_dates_fill_both_fields() {
        let mut fields = FormFields::new();
        fields.apply_default_dates("2026-10-18");
        assert_eq!(fields.get(DATE_ORDERED), "2026-10-18");
        assert_eq!(fields.get(SIGNATURE_DATE), "2026-10-18");
        assert_eq!(today_iso().len(), 10);
    }
}
