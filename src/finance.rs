//! Real-estate development financial model.
//!
//! The model is a waterfall: land → surfaces → units → costs → financial
//! restructuring → sales → company profits. Each stage reads raw inputs and
//! the figures of earlier stages only, so the stages form an ordered graph.
//! Changing an input recomputes the first stage that reads it and every stage
//! after it; nothing upstream is touched and nothing downstream is left stale.
//!
//! Only the inputs are persisted. Figures are rebuilt when a model is loaded.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const LAND_COMMISSION_RATE: f64 = 0.025;
const RE_TRANSACTION_TAX_RATE: f64 = 0.05;
const SALES_AREA_RATIO: f64 = 0.85;
const APARTMENTS_PER_VILLA: f64 = 3.0;
const SALES_COMMISSION_DIVISOR: f64 = 1.025;
const INVESTOR_PROFIT_RATIO: f64 = 0.85;
const MGMT_FEE_RATE: f64 = 0.15;
const MARKETING_RATE: f64 = 0.025;

/// Raw inputs entered for a development project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevelopmentInputs {
    pub depth: f64,
    pub width: f64,
    pub upper_factor: f64,
    pub meter_price: f64,
    pub meter_price_for_shareholders: f64,
    pub villas_number: f64,
    pub government_engineering_costs: f64,
    pub villa_cost: f64,
    pub supervision_percent: f64,
    pub cost_per_meter: f64,
    pub financing_cost: f64,
    pub investors_share: f64,
    pub company_share: f64,
    pub avg_floor_price_incl_commission: f64,
    pub sales_total: f64,
}

/// Everything derived from [`DevelopmentInputs`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevelopmentFigures {
    // land
    pub area: f64,
    // surfaces
    pub total_upper_surfaces: f64,
    pub lower_factor: f64,
    pub total_lower_surfaces: f64,
    pub surfaces_total: f64,
    pub surfaces_factor: f64,
    pub total_sales_area: f64,
    pub sales_area_factor: f64,
    // units
    pub apartments_number: f64,
    pub average_areas: f64,
    // costs
    pub land_cost: f64,
    pub land_commission: f64,
    pub re_transaction_tax: f64,
    pub land_cost_total: f64,
    pub construction_cost_per_meter: f64,
    pub villa_construction_cost: f64,
    pub estimated_construction_cost: f64,
    pub gov_eng_costs_dev: f64,
    pub supervision_dev: f64,
    pub total_cost: f64,
    pub floor_avg_cost: f64,
    // restructuring
    pub capital: f64,
    pub financing: f64,
    pub total_company_amounts: f64,
    pub total_investor_amounts: f64,
    // sales
    pub avg_floor_price_excl_commission: f64,
    pub profits_total: f64,
    pub project_profit_margin: f64,
    pub capital_gains_rate: f64,
    pub investor_profit_percent: f64,
    pub investor_profits: f64,
    // company profits
    pub company_investment_profits: f64,
    pub investment_mgmt_fee: f64,
    pub dev_marketing_striving: f64,
    pub dev_supervision: f64,
    pub diff_meter_price: f64,
    pub total_dev_earnings: f64,
}

/// Waterfall stages in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Land,
    Surfaces,
    Units,
    Costs,
    Restructuring,
    Sales,
    CompanyProfits,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Land,
        Stage::Surfaces,
        Stage::Units,
        Stage::Costs,
        Stage::Restructuring,
        Stage::Sales,
        Stage::CompanyProfits,
    ];
}

/// Names of the editable inputs, as accepted by `spm finance set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputField {
    Depth,
    Width,
    UpperFactor,
    MeterPrice,
    MeterPriceForShareholders,
    VillasNumber,
    GovernmentEngineeringCosts,
    VillaCost,
    SupervisionPercent,
    CostPerMeter,
    FinancingCost,
    InvestorsShare,
    CompanyShare,
    AvgFloorPriceInclCommission,
    SalesTotal,
}

impl InputField {
    /// First stage that reads this input.
    pub fn stage(self) -> Stage {
        use InputField::*;
        match self {
            Depth | Width => Stage::Land,
            UpperFactor => Stage::Surfaces,
            VillasNumber => Stage::Units,
            MeterPrice | VillaCost | SupervisionPercent | CostPerMeter | FinancingCost
            | GovernmentEngineeringCosts => Stage::Costs,
            InvestorsShare | CompanyShare => Stage::Restructuring,
            AvgFloorPriceInclCommission | SalesTotal => Stage::Sales,
            MeterPriceForShareholders => Stage::CompanyProfits,
        }
    }

    fn slot(self, inputs: &mut DevelopmentInputs) -> &mut f64 {
        use InputField::*;
        match self {
            Depth => &mut inputs.depth,
            Width => &mut inputs.width,
            UpperFactor => &mut inputs.upper_factor,
            MeterPrice => &mut inputs.meter_price,
            MeterPriceForShareholders => &mut inputs.meter_price_for_shareholders,
            VillasNumber => &mut inputs.villas_number,
            GovernmentEngineeringCosts => &mut inputs.government_engineering_costs,
            VillaCost => &mut inputs.villa_cost,
            SupervisionPercent => &mut inputs.supervision_percent,
            CostPerMeter => &mut inputs.cost_per_meter,
            FinancingCost => &mut inputs.financing_cost,
            InvestorsShare => &mut inputs.investors_share,
            CompanyShare => &mut inputs.company_share,
            AvgFloorPriceInclCommission => &mut inputs.avg_floor_price_incl_commission,
            SalesTotal => &mut inputs.sales_total,
        }
    }
}

/// Inputs plus the figures derived from them, always consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "DevelopmentInputs", into = "DevelopmentInputs")]
pub struct DevelopmentModel {
    inputs: DevelopmentInputs,
    figures: DevelopmentFigures,
}

impl From<DevelopmentInputs> for DevelopmentModel {
    fn from(inputs: DevelopmentInputs) -> Self {
        let mut model = DevelopmentModel {
            inputs,
            figures: DevelopmentFigures::default(),
        };
        model.recompute_from(Stage::Land);
        model
    }
}

impl From<DevelopmentModel> for DevelopmentInputs {
    fn from(model: DevelopmentModel) -> Self {
        model.inputs
    }
}

/// `num / den`, or 0 when the divisor is zero.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Two decimals, ties to even.
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

impl DevelopmentModel {
    pub fn inputs(&self) -> &DevelopmentInputs {
        &self.inputs
    }

    pub fn figures(&self) -> &DevelopmentFigures {
        &self.figures
    }

    /// Change one input and recompute the affected part of the waterfall.
    ///
    /// Returns the first stage that was recomputed, or `None` when the value
    /// did not change.
    pub fn set(&mut self, field: InputField, value: f64) -> Option<Stage> {
        let slot = field.slot(&mut self.inputs);
        if *slot == value {
            return None;
        }
        *slot = value;
        let stage = field.stage();
        self.recompute_from(stage);
        Some(stage)
    }

    fn recompute_from(&mut self, first: Stage) {
        for stage in Stage::ALL.into_iter().filter(|s| *s >= first) {
            self.compute_stage(stage);
        }
    }

    fn compute_stage(&mut self, stage: Stage) {
        let i = &self.inputs;
        let f = &mut self.figures;
        match stage {
            Stage::Land => {
                f.area = i.depth * i.width;
            }
            Stage::Surfaces => {
                let area = f.area;
                f.total_upper_surfaces = i.upper_factor * area;
                f.lower_factor = ratio(3.0 * (i.width - 4.0), area);
                f.total_lower_surfaces = f.lower_factor * area;
                f.surfaces_total = f.total_upper_surfaces + f.total_lower_surfaces;
                f.surfaces_factor = ratio(f.surfaces_total, area);
                f.total_sales_area = f.total_upper_surfaces * SALES_AREA_RATIO;
                f.sales_area_factor = ratio(f.total_sales_area, area);
            }
            Stage::Units => {
                f.apartments_number = i.villas_number * APARTMENTS_PER_VILLA;
                f.average_areas = ratio(f.total_sales_area, f.apartments_number);
            }
            Stage::Costs => {
                f.land_cost = i.meter_price * f.area;
                f.land_commission = f.land_cost * LAND_COMMISSION_RATE;
                f.re_transaction_tax = f.land_cost * RE_TRANSACTION_TAX_RATE;
                f.land_cost_total = f.land_cost + f.land_commission + f.re_transaction_tax;
                f.construction_cost_per_meter = i.cost_per_meter * f.surfaces_total;
                f.villa_construction_cost = i.villas_number * i.villa_cost;
                f.estimated_construction_cost = f.villa_construction_cost;
                f.gov_eng_costs_dev = i.government_engineering_costs * f.apartments_number;
                f.supervision_dev = (i.supervision_percent / 100.0)
                    * (f.estimated_construction_cost + f.gov_eng_costs_dev);
                f.total_cost = f.estimated_construction_cost
                    + f.land_cost_total
                    + f.supervision_dev
                    + f.gov_eng_costs_dev
                    + i.financing_cost;
                f.floor_avg_cost = ratio(f.total_cost, f.apartments_number);
            }
            Stage::Restructuring => {
                f.capital = f.land_cost_total + i.financing_cost;
                f.financing =
                    f.estimated_construction_cost + f.gov_eng_costs_dev + f.supervision_dev;
                f.total_company_amounts = i.company_share * f.capital;
                f.total_investor_amounts = i.investors_share * f.capital;
            }
            Stage::Sales => {
                f.avg_floor_price_excl_commission =
                    i.avg_floor_price_incl_commission / SALES_COMMISSION_DIVISOR;
                f.profits_total = i.sales_total - f.total_cost;
                f.project_profit_margin = if f.total_cost == 0.0 {
                    0.0
                } else {
                    i.sales_total / f.total_cost - 1.0
                };
                f.capital_gains_rate = ratio(f.profits_total, f.capital);
                f.investor_profit_percent = f.capital_gains_rate * INVESTOR_PROFIT_RATIO;
                f.investor_profits = f.investor_profit_percent * INVESTOR_PROFIT_RATIO;
            }
            Stage::CompanyProfits => {
                f.company_investment_profits =
                    f.total_company_amounts * round2(f.investor_profit_percent);
                f.investment_mgmt_fee = f.profits_total * MGMT_FEE_RATE;
                f.dev_marketing_striving = i.sales_total * MARKETING_RATE;
                f.dev_supervision = f.supervision_dev;
                f.diff_meter_price = f.area * (i.meter_price - i.meter_price_for_shareholders);
                f.total_dev_earnings = f.company_investment_profits
                    + f.investment_mgmt_fee
                    + f.dev_marketing_striving
                    + f.dev_supervision
                    + f.diff_meter_price;
            }
        }
    }

    /// Rows of the developer sheet, in print order.
    pub fn developer_rows(&self) -> Vec<(&'static str, f64)> {
        let f = &self.figures;
        vec![
            ("Land Cost", f.land_cost),
            ("Land Commission", f.land_commission),
            ("RE Transaction Tax", f.re_transaction_tax),
            ("Land Cost Total", f.land_cost_total),
            ("Construction Cost per Meter", f.construction_cost_per_meter),
            ("Villa Construction Cost", f.villa_construction_cost),
            ("Estimated Construction Cost", f.estimated_construction_cost),
            ("Gov. & Eng. Costs (Dev)", f.gov_eng_costs_dev),
            ("Supervision (Dev)", f.supervision_dev),
            ("Financing Cost", self.inputs.financing_cost),
            ("Total Cost", f.total_cost),
            ("Floor Average Cost", f.floor_avg_cost),
            ("Capital", f.capital),
            ("Financing", f.financing),
            ("Total Company Amounts", f.total_company_amounts),
            ("Total Investor Amounts", f.total_investor_amounts),
            ("Avg. Floor Price (Excl. Commission)", f.avg_floor_price_excl_commission),
            ("Profits Total", f.profits_total),
            ("Project Profit Margin", f.project_profit_margin),
            ("Capital Gains Rate", f.capital_gains_rate),
            ("Company Investment Profits", f.company_investment_profits),
            ("Investment Management Fee 15%", f.investment_mgmt_fee),
            ("Developer Marketing Striving", f.dev_marketing_striving),
            ("Construction Supervision for Developer", f.dev_supervision),
            ("Different Meter Price in Land Purchase", f.diff_meter_price),
            ("Total Developer Earnings", f.total_dev_earnings),
        ]
    }

    /// Rows of the investor sheet, in print order.
    pub fn investor_rows(&self) -> Vec<(&'static str, f64)> {
        let f = &self.figures;
        vec![
            ("The Area", f.area),
            ("Total Sales Area", f.total_sales_area),
            ("Apartments Number", f.apartments_number),
            ("Average Areas", f.average_areas),
            ("Capital", f.capital),
            ("Total Investor Amounts", f.total_investor_amounts),
            ("Sales Total", self.inputs.sales_total),
            ("Profits Total", f.profits_total),
            ("Capital Gains Rate", f.capital_gains_rate),
            ("Investor Profit Percentage", f.investor_profit_percent),
            ("Investor Profits", f.investor_profits),
        ]
    }

    /// Land and surface inputs with their direct derivations.
    pub fn input_rows(&self) -> Vec<(&'static str, f64)> {
        let i = &self.inputs;
        let f = &self.figures;
        vec![
            ("Depth", i.depth),
            ("Width", i.width),
            ("The Area", f.area),
            ("Upper Factor", i.upper_factor),
            ("Total Upper Surfaces", f.total_upper_surfaces),
            ("Lower Factor", f.lower_factor),
            ("Total Lower Surfaces", f.total_lower_surfaces),
            ("Surfaces Total", f.surfaces_total),
            ("Surfaces Factor", f.surfaces_factor),
            ("Total Sales Area", f.total_sales_area),
            ("Sales Area Factor", f.sales_area_factor),
            ("Meter Price", i.meter_price),
            ("Meter Price for Shareholders", i.meter_price_for_shareholders),
            ("Villas Number", i.villas_number),
            ("Apartments Number", f.apartments_number),
            ("Average Areas", f.average_areas),
            ("Government and Engineering Costs", i.government_engineering_costs),
            ("Villa Cost", i.villa_cost),
            ("Supervision (%)", i.supervision_percent),
            ("Cost per Meter", i.cost_per_meter),
            ("Investors Share", i.investors_share),
            ("Company Share", i.company_share),
            ("Avg. Floor Price (Incl. Commission)", i.avg_floor_price_incl_commission),
        ]
    }
}
