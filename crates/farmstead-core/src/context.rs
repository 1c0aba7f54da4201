//! Context builder: pure derivation of policy inputs.
//!
//! [`build_context`] reads the shared resources, prices, one farm, and the
//! period's drivers, and produces that farm's [`AllocationContext`]. The
//! domain functions then narrow it, feeding in upstream decisions where a
//! domain depends on them:
//!
//! ```text
//! crop       <- context
//! processing <- context
//! water      <- context + crop + processing
//! energy     <- context + processing
//! market     <- context + processing
//! economic   <- context + water + energy + processing + market
//! ```
//!
//! Nothing here mutates state. Calling any function twice with the same
//! inputs gives the same output.

use farmstead_resources::{AquiferState, WaterStorageState};
use farmstead_types::{
    AllocationContext, CropContext, CropDecision, EconomicContext, EnergyContext, EnergyDecision,
    MarketContext, MarketDecision, PeriodDrivers, PriceSnapshot, ProcessingContext,
    ProcessingDecision, ResourceReading, WaterContext, WaterDecision,
};

use crate::clock::PeriodSlot;
use crate::config::PriceConfig;
use crate::scenario::FarmState;

/// Read-only view of the state shared by all farms.
#[derive(Debug, Clone, Copy)]
pub struct SharedView<'a> {
    /// The aquifer, as left by earlier farms this period.
    pub aquifer: &'a AquiferState,
    /// Community storage, as left by earlier farms this period.
    pub storage: &'a WaterStorageState,
    /// Prices in force.
    pub prices: &'a PriceConfig,
}

/// Build one farm's context for one period.
pub fn build_context(
    shared: &SharedView<'_>,
    farm: &FarmState,
    slot: &PeriodSlot,
    drivers: &PeriodDrivers,
) -> AllocationContext {
    let aquifer = shared.aquifer;
    let spec = farm.spec();
    let profile = spec.profile(slot.days);

    let resources = ResourceReading {
        aquifer_remaining_m3: aquifer.remaining_m3(),
        aquifer_remaining_fraction: aquifer.remaining_fraction(),
        drawdown_m: aquifer.drawdown_m(),
        effective_head_m: aquifer.effective_head_m(),
        pumping_energy_kwh_per_m3: aquifer.pumping_energy_per_m3(),
        storage_volume_m3: shared.storage.current_volume_m3(),
        storage_capacity_m3: shared.storage.capacity_m3(),
    };
    let prices = PriceSnapshot {
        energy_price_per_kwh: shared.prices.energy_price_per_kwh,
        municipal_tariff_per_m3: shared.prices.municipal_tariff_per_m3,
        groundwater_maintenance_per_m3: shared.prices.groundwater_maintenance_per_m3
            + spec.equipment_maintenance_per_m3,
        grid_export_price_per_kwh: shared.prices.grid_export_price_per_kwh,
        generator_cost_per_kwh: shared.prices.generator_cost_per_kwh
            + spec.generator_maintenance_per_kwh,
        crop_price_per_kg: shared.prices.crop_price_per_kg,
    };
    let groundwater_energy =
        resources.pumping_energy_kwh_per_m3 + profile.treatment_energy_kwh_per_m3;
    let groundwater_cost_per_m3 = groundwater_energy.mul_add(
        prices.energy_price_per_kwh,
        prices.groundwater_maintenance_per_m3,
    );

    AllocationContext {
        period: slot.period,
        date: slot.date,
        year_index: slot.year_index,
        farm_id: farm.id(),
        farm_name: farm.name().to_owned(),
        resources,
        prices,
        groundwater_cost_per_m3,
        drivers: *drivers,
        profile,
        carried: *farm.carried(),
    }
}

/// Irrigation requirement for the farm's area.
pub fn crop_context(ctx: &AllocationContext) -> CropContext {
    CropContext {
        requirement_m3: ctx.drivers.irrigation_m3_per_ha * ctx.profile.area_ha,
        temperature_c: ctx.drivers.temperature_c,
    }
}

/// Harvest to route through the processing lines.
pub fn processing_context(ctx: &AllocationContext) -> ProcessingContext {
    ProcessingContext {
        harvest_kg: ctx.drivers.harvest_kg_per_ha * ctx.profile.area_ha,
        capacity: ctx.profile.processing,
        rates: ctx.profile.processing_rates,
    }
}

/// Water demand and the sources available to meet it.
///
/// Demand is applied irrigation plus processing water plus the farm's
/// base use. Groundwater is bounded by the well, the treatment unit, and
/// what remains in the aquifer.
pub fn water_context(
    ctx: &AllocationContext,
    crop: &CropDecision,
    processing: &ProcessingDecision,
) -> WaterContext {
    let rates = &ctx.profile.processing_rates;
    let processing_water =
        rates.water_m3(processing.packaged_kg, processing.canned_kg, processing.dried_kg);
    let profile = &ctx.profile;
    WaterContext {
        demand_m3: crop.applied_m3 + processing_water + ctx.drivers.base_water_m3,
        storage_available_m3: profile
            .storage_allowance_m3
            .min(ctx.resources.storage_volume_m3),
        groundwater_capacity_m3: profile
            .well_capacity_m3
            .min(profile.treatment_capacity_m3)
            .min(ctx.resources.aquifer_remaining_m3),
        municipal_capacity_m3: profile.municipal_capacity_m3,
        groundwater_cost_per_m3: ctx.groundwater_cost_per_m3,
        groundwater_energy_kwh_per_m3: ctx.resources.pumping_energy_kwh_per_m3
            + profile.treatment_energy_kwh_per_m3,
        municipal_tariff_per_m3: ctx.prices.municipal_tariff_per_m3,
    }
}

/// Energy demand (base plus processing) and the supply options.
///
/// Groundwater pumping and treatment energy is billed through the water
/// decision's cost and is not part of this demand.
pub fn energy_context(ctx: &AllocationContext, processing: &ProcessingDecision) -> EnergyContext {
    let rates = &ctx.profile.processing_rates;
    let processing_energy =
        rates.energy_kwh(processing.packaged_kg, processing.canned_kg, processing.dried_kg);
    EnergyContext {
        demand_kwh: ctx.drivers.base_energy_kwh + processing_energy,
        renewable_available_kwh: ctx.profile.pv_kw * ctx.drivers.pv_kwh_per_kw,
        grid_capacity_kwh: ctx.profile.grid_capacity_kwh,
        generator_capacity_kwh: ctx.profile.generator_capacity_kwh,
        grid_price_per_kwh: ctx.prices.energy_price_per_kwh,
        generator_cost_per_kwh: ctx.prices.generator_cost_per_kwh,
        export_price_per_kwh: ctx.prices.grid_export_price_per_kwh,
    }
}

/// Product to sell: fresh output plus all storable stock.
pub fn market_context(ctx: &AllocationContext, processing: &ProcessingDecision) -> MarketContext {
    MarketContext {
        fresh_kg: processing.fresh_kg,
        storable_kg: ctx.carried.inventory_kg + processing.processed_kg(),
        price_per_kg: ctx.prices.crop_price_per_kg * ctx.drivers.price_multiplier,
        price_multiplier: ctx.drivers.price_multiplier,
        storage_capacity_kg: ctx.profile.inventory_capacity_kg,
    }
}

/// Net income for the period and the farm's balance sheet.
pub fn economic_context(
    ctx: &AllocationContext,
    water: &WaterDecision,
    energy: &EnergyDecision,
    processing: &ProcessingDecision,
    market: &MarketDecision,
) -> EconomicContext {
    EconomicContext {
        net_income: market.revenue - water.cost() - energy.net_cost() - processing.cost,
        cash_on_hand: ctx.carried.cash,
        debt_outstanding: ctx.carried.debt,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use farmstead_policies::{Policy, ProcessingPolicy};

    use super::*;
    use crate::exogenous::tests::make_drivers;
    use crate::scenario::tests::make_state;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn make_ctx(drivers: &PeriodDrivers) -> AllocationContext {
        let state = make_state();
        let slot = state.clock().slot(0).unwrap();
        let shared = SharedView {
            aquifer: state.aquifer(),
            storage: state.storage(),
            prices: state.prices(),
        };
        build_context(&shared, state.farms().first().unwrap(), &slot, drivers)
    }

    #[test]
    fn groundwater_cost_includes_pumping_and_treatment() {
        let ctx = make_ctx(&make_drivers(30.0, 0.0));
        // Full aquifer: head = well depth 60 m.
        assert!(approx(ctx.resources.effective_head_m, 60.0));
        let pumping = ctx.resources.pumping_energy_kwh_per_m3;
        assert!(pumping > 0.16 && pumping < 0.17);
        // treatment_standard: 0.5 kWh/m³, 0.02 $/m³; well_standard 0.015 $/m³.
        let expected = (pumping + 0.5) * 0.12 + 0.05 + 0.015 + 0.02;
        assert!(approx(ctx.groundwater_cost_per_m3, expected));
    }

    #[test]
    fn water_demand_sums_irrigation_processing_and_base() {
        let ctx = make_ctx(&make_drivers(30.0, 100.0));
        let crop = CropDecision {
            requirement_m3: 300.0,
            applied_m3: 240.0,
            deficit_m3: 60.0,
        };
        let processing = ProcessingPolicy::MaximizeStorage.decide(&processing_context(&ctx));
        // 10 ha x 100 kg/ha = 1000 kg, all packaged at 0.001 m³/kg.
        assert!(approx(processing.packaged_kg, 1_000.0));
        let water = water_context(&ctx, &crop, &processing);
        assert!(approx(water.demand_m3, 240.0 + 1.0 + 2.0));
        // Allowance 50 m³/day but storage only holds 50 m³.
        assert!(approx(water.storage_available_m3, 50.0));
        // Well 400, treatment 500: the well binds.
        assert!(approx(water.groundwater_capacity_m3, 400.0));
    }

    #[test]
    fn energy_demand_excludes_pumping() {
        let ctx = make_ctx(&make_drivers(30.0, 100.0));
        let processing = ProcessingPolicy::MaximizeStorage.decide(&processing_context(&ctx));
        let energy = energy_context(&ctx, &processing);
        // 50 base + 1000 kg x 0.02 kWh/kg.
        assert!(approx(energy.demand_kwh, 70.0));
        // 20 kW x 5 kWh/kW.
        assert!(approx(energy.renewable_available_kwh, 100.0));
        assert!(approx(energy.generator_capacity_kwh, 0.0));
    }

    #[test]
    fn market_offers_fresh_and_storable() {
        let mut drivers = make_drivers(30.0, 100.0);
        drivers.price_multiplier = 1.5;
        let ctx = make_ctx(&drivers);
        let processing = ProcessingPolicy::AllFresh.decide(&processing_context(&ctx));
        let market = market_context(&ctx, &processing);
        assert!(approx(market.fresh_kg, 1_000.0));
        assert!(approx(market.storable_kg, 0.0));
        assert!(approx(market.price_per_kg, 1.8));
    }

    #[test]
    fn builder_is_pure() {
        let drivers = make_drivers(30.0, 100.0);
        assert_eq!(make_ctx(&drivers), make_ctx(&drivers));
    }
}
