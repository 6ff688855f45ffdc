use sqlx::SqliteConnection;
use tracing::info;

use crate::columns::{ColumnSpec, RowInserter, RowValues};
use crate::error::AppResult;
use crate::household::Household;
use crate::prng::Mulberry32;
use crate::time::{ANCHOR_MS, DAY_MS};

pub const VEHICLES_PER_HOUSEHOLD: usize = 2;
pub const PETS_PER_HOUSEHOLD: usize = 2;

const VEHICLES: [(&str, &str, &str); 6] = [
    ("Family car", "Toyota", "Corolla"),
    ("Runaround", "Volkswagen", "Polo"),
    ("Camper", "Ford", "Transit"),
    ("Commuter", "Tesla", "Model 3"),
    ("Weekend car", "Mazda", "MX-5"),
    ("School run", "Skoda", "Octavia"),
];

const PETS: [(&str, &str); 6] = [
    ("Biscuit", "dog"),
    ("Luna", "cat"),
    ("Pip", "rabbit"),
    ("Mochi", "cat"),
    ("Rex", "dog"),
    ("Kiwi", "parrot"),
];

const VEHICLE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id"),
    ColumnSpec::new("household_id"),
    ColumnSpec::new("name"),
    ColumnSpec::new("make"),
    ColumnSpec::new("model"),
    ColumnSpec::with_fallbacks("reg", &["registration"]),
    ColumnSpec::new("next_mot_due"),
    ColumnSpec::new("next_service_due"),
    ColumnSpec::new("position"),
    ColumnSpec::new("created_at"),
    ColumnSpec::new("updated_at"),
];

const PET_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id"),
    ColumnSpec::new("household_id"),
    ColumnSpec::new("name"),
    ColumnSpec::with_fallbacks("type", &["species"]),
    ColumnSpec::new("position"),
    ColumnSpec::new("created_at"),
    ColumnSpec::new("updated_at"),
];

/// Vehicle and pet ids per household, indexed like the household list.
#[derive(Debug, Clone, Default)]
pub struct SupportingRecords {
    pub vehicles: Vec<Vec<String>>,
    pub pets: Vec<Vec<String>>,
}

impl SupportingRecords {
    pub fn vehicles_for(&self, index: usize) -> &[String] {
        self.vehicles.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pets_for(&self, index: usize) -> &[String] {
        self.pets.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.iter().map(Vec::len).sum()
    }

    pub fn pet_count(&self) -> usize {
        self.pets.iter().map(Vec::len).sum()
    }
}

fn registration(rng: &mut Mulberry32) -> String {
    const LETTERS: &[u8] = b"ABCDEFGHJKLMNPRSTVWXY";
    let mut reg = String::with_capacity(8);
    for _ in 0..2 {
        reg.push(*rng.choice(LETTERS) as char);
    }
    reg.push_str(&format!("{:02} ", rng.int_range(10, 74)));
    for _ in 0..3 {
        reg.push(*rng.choice(LETTERS) as char);
    }
    reg
}

pub async fn generate_supporting(
    conn: &mut SqliteConnection,
    rng: &mut Mulberry32,
    households: &[Household],
) -> AppResult<SupportingRecords> {
    let vehicles = RowInserter::prepare(conn, "vehicles", VEHICLE_COLUMNS).await?;
    let pets = RowInserter::prepare(conn, "pets", PET_COLUMNS).await?;
    let mut records = SupportingRecords::default();

    for (slot, household) in households.iter().enumerate() {
        let mut vehicle_ids = Vec::with_capacity(VEHICLES_PER_HOUSEHOLD);
        for position in 0..VEHICLES_PER_HOUSEHOLD {
            let id = format!("veh_{}_{}", household.id, position + 1);
            let (name, make, model) =
                VEHICLES[(slot * VEHICLES_PER_HOUSEHOLD + position) % VEHICLES.len()];
            let created_at = ANCHOR_MS - rng.int_range(30, 700) * DAY_MS;
            let row = RowValues::new()
                .set("id", id.as_str())
                .set("household_id", household.id.as_str())
                .set("name", name)
                .set("make", make)
                .set("model", model)
                .set("reg", registration(rng))
                .set("next_mot_due", ANCHOR_MS + rng.int_range(10, 365) * DAY_MS)
                .set("next_service_due", ANCHOR_MS + rng.int_range(10, 365) * DAY_MS)
                .set("position", position as i64)
                .set("created_at", created_at)
                .set("updated_at", created_at);
            vehicles.insert(conn, &row).await?;
            vehicle_ids.push(id);
        }

        let mut pet_ids = Vec::with_capacity(PETS_PER_HOUSEHOLD);
        for position in 0..PETS_PER_HOUSEHOLD {
            let id = format!("pet_{}_{}", household.id, position + 1);
            let (name, kind) = PETS[(slot * PETS_PER_HOUSEHOLD + position) % PETS.len()];
            let created_at = ANCHOR_MS - rng.int_range(30, 700) * DAY_MS;
            let row = RowValues::new()
                .set("id", id.as_str())
                .set("household_id", household.id.as_str())
                .set("name", name)
                .set("type", kind)
                .set("position", position as i64)
                .set("created_at", created_at)
                .set("updated_at", created_at);
            pets.insert(conn, &row).await?;
            pet_ids.push(id);
        }

        records.vehicles.push(vehicle_ids);
        records.pets.push(pet_ids);
    }

    info!(
        target: "arklowdun",
        event = "seed_supporting",
        vehicles = records.vehicle_count(),
        pets = records.pet_count()
    );
    Ok(records)
}
