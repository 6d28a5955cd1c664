use crate::features::form::FormFields;
use regex::Regex;
use std::sync::OnceLock;

pub const MATERIAL_ROWS: usize = 6;

pub const LABOR: &str = "labor";
pub const INSURANCE: &str = "wcIns";
pub const DISPOSAL: &str = "tearOffDump";
pub const COMMISSION: &str = "commission";
pub const CONTRACT_PRICE: &str = "contractPrice";
pub const OVERHEAD: &str = "overhead";

pub const TOTAL_MATERIAL: &str = "totalMaterial";
pub const TOTAL_COST: &str = "totalCost";
pub const GROSS_PROFIT: &str = "grossProfit";
pub const NET_PROFIT: &str = "netProfit";

/// Inputs that feed the summary directly (material rows feed it through their totals).
pub const SUMMARY_INPUTS: [&str; 6] = [
    LABOR,
    INSURANCE,
    DISPOSAL,
    COMMISSION,
    CONTRACT_PRICE,
    OVERHEAD,
];

pub fn qty_key(row: usize) -> String {
    format!("qty{row}")
}

pub fn price_key(row: usize) -> String {
    format!("price{row}")
}

pub fn total_key(row: usize) -> String {
    format!("total{row}")
}

/// Snapshot of the numbers behind the summary display fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSummary {
    pub total_material: f64,
    pub labor: f64,
    pub insurance: f64,
    pub disposal: f64,
    pub commission: f64,
    pub total_cost: f64,
    pub contract_price: f64,
    pub overhead: f64,
    pub gross_profit_pct: Option<f64>,
    pub net_profit: Option<f64>,
}

/// Browser-style number parsing: the longest leading numeric literal wins,
/// anything else (including non-finite results) is zero.
pub fn parse_amount(raw: &str) -> f64 {
    static NUMERIC_PREFIX: OnceLock<Option<Regex>> = OnceLock::new();
    let re = NUMERIC_PREFIX.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").ok()
    });
    let Some(re) = re else {
        return 0.0;
    };
    re.find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Fixed-point formatting with half-away-from-zero rounding.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let mut rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        // Avoid "-0.00".
        rounded = 0.0;
    }
    format!("{rounded:.decimals$}")
}

pub fn format_currency(value: f64) -> String {
    format!("${}", format_fixed(value, 2))
}

fn currency_or_blank(value: f64) -> String {
    if value > 0.0 {
        format_currency(value)
    } else {
        String::new()
    }
}

fn amount(fields: &FormFields, key: &str) -> f64 {
    parse_amount(fields.get(key))
}

/// Raw product for one row; rows are numbered 1..=6.
pub fn row_product(fields: &FormFields, row: usize) -> f64 {
    amount(fields, &qty_key(row)) * amount(fields, &price_key(row))
}

/// Recompute one row's total field, then the whole summary.
pub fn recompute_row(fields: &mut FormFields, row: usize) -> CostSummary {
    if (1..=MATERIAL_ROWS).contains(&row) {
        let total = row_product(fields, row);
        fields.set_derived(&total_key(row), currency_or_blank(total));
    }
    recompute_summary(fields)
}

/// Recompute every row total and the summary.
pub fn recompute_all(fields: &mut FormFields) -> CostSummary {
    for row in 1..=MATERIAL_ROWS {
        let total = row_product(fields, row);
        fields.set_derived(&total_key(row), currency_or_blank(total));
    }
    recompute_summary(fields)
}

pub fn compute_summary(fields: &FormFields) -> CostSummary {
    let total_material: f64 = (1..=MATERIAL_ROWS).map(|row| row_product(fields, row)).sum();
    let labor = amount(fields, LABOR);
    let insurance = amount(fields, INSURANCE);
    let disposal = amount(fields, DISPOSAL);
    let commission = amount(fields, COMMISSION);
    let contract_price = amount(fields, CONTRACT_PRICE);
    let overhead = amount(fields, OVERHEAD);

    let total_cost = total_material + labor + insurance + disposal + commission;

    let (gross_profit_pct, net_profit) = if contract_price > 0.0 && total_cost > 0.0 {
        (
            Some((contract_price - total_cost) / contract_price * 100.0),
            Some(contract_price - total_cost - overhead),
        )
    } else {
        (None, None)
    };

    CostSummary {
        total_material,
        labor,
        insurance,
        disposal,
        commission,
        total_cost,
        contract_price,
        overhead,
        gross_profit_pct,
        net_profit,
    }
}

pub fn recompute_summary(fields: &mut FormFields) -> CostSummary {
    let summary = compute_summary(fields);

    fields.set_derived(TOTAL_MATERIAL, currency_or_blank(summary.total_material));
    fields.set_derived(TOTAL_COST, currency_or_blank(summary.total_cost));
    fields.set_derived(
        GROSS_PROFIT,
        summary
            .gross_profit_pct
            .map(|pct| format!("{}%", format_fixed(pct, 1)))
            .unwrap_or_default(),
    );
    fields.set_derived(
        NET_PROFIT,
        summary.net_profit.map(format_currency).unwrap_or_default(),
    );

    summary
}
