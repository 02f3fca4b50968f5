//! Polymorphic Hydration Demo
//!
//! Hydrates a mixed result set of pets into concrete records, then flushes
//! the pass. Run with `RUST_LOG=elif_hydration=trace` to see resolution.

use elif_hydration::{
    ComponentDefinition, HydrationConfig, HydrationResult, Hydrator, Row, SchemaRegistry,
    VecRowSupplier,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
enum Pet {
    Animal { name: String },
    Dog { name: String, good_boy: bool },
    Cat { name: String, lives: i32 },
}

fn schema() -> HydrationResult<SchemaRegistry<Pet>> {
    SchemaRegistry::new()
        .with_component(
            ComponentDefinition::new("Animal", |row: &Row| {
                Ok(Pet::Animal {
                    name: row.get_as("name")?,
                })
            })
            .with_subclasses(["Dog", "Cat"])
            .with_identifier(["id"]),
        )?
        .with_component(
            ComponentDefinition::new("Dog", |row: &Row| {
                Ok(Pet::Dog {
                    name: row.get_as("name")?,
                    good_boy: row.try_get_as("good_boy")?.unwrap_or(true),
                })
            })
            .with_discriminator("type", "dog")
            .with_identifier(["id"]),
        )?
        .with_component(
            ComponentDefinition::new("Cat", |row: &Row| {
                Ok(Pet::Cat {
                    name: row.get_as("name")?,
                    lives: row.try_get_as("lives")?.unwrap_or(9),
                })
            })
            .with_discriminator("type", "cat")
            .with_identifier(["id"]),
        )
}

#[tokio::main]
async fn main() -> HydrationResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rows = vec![
        Row::from_json(json!({"id": 1, "type": "dog", "name": "Rex"}))?,
        Row::from_json(json!({"id": 2, "type": "cat", "name": "Tom", "lives": 7}))?,
        Row::from_json(json!({"id": 3, "type": "fish", "name": "Nemo"}))?,
        Row::from_json(json!({"id": null, "type": null, "name": "Stray"}))?,
    ];

    let mut hydrator = Hydrator::with_config(schema()?, HydrationConfig::from_env()?)?;
    let mut pass = hydrator.begin_pass();

    for row in &rows {
        println!(
            "row {} identifiable: {}",
            row.to_json(),
            pass.is_identifiable(row, "Animal")?
        );
    }

    let mut supplier = VecRowSupplier::new(rows);
    let pets = pass.hydrate_from(&mut supplier, "Animal").await?;
    let report = pass.finish();

    println!("{:#?}", pets.records());
    println!(
        "flushed {} collection(s), restored {} handle(s), hydrated {} record(s)",
        report.collections_snapshotted, report.handles_restored, report.records_hydrated
    );

    Ok(())
}
