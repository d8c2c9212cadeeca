//! Tests for parameter cells and bindings
//!
//! A cell reads through its binding until it is written directly; after that
//! it keeps its own value for good.

use crate::config::ExecutionConfig;
use crate::error::{ConfigError, SimError};
use crate::model::{CellRef, Value};
use crate::registry::{Binding, Registry};
use crate::simulation::{Simulation, scalar};
use crate::sweep::SweepAxis;

/// Owner of a shared setting plus two objects that inherit it
fn inherited() -> (Registry<f64>, [crate::model::ObjectId; 3]) {
    let mut registry = Registry::new();
    let settings = registry.create_plain("settings").unwrap();
    let qubit = registry.create_leaf("qubit", 2).unwrap();
    let cavity = registry.create_leaf("cavity", 5).unwrap();

    registry.write(settings, "temperature", 0.02).unwrap();
    registry
        .bind(qubit, "temperature", CellRef::new(settings, "temperature"))
        .unwrap();
    registry
        .bind(cavity, "temperature", CellRef::new(qubit, "temperature"))
        .unwrap();
    for id in [qubit, cavity] {
        registry
            .set_rebuild(id, |view| view.f64("temperature"))
            .unwrap();
    }
    (registry, [settings, qubit, cavity])
}

#[test]
fn test_bound_cell_tracks_its_source() {
    let (mut registry, [settings, qubit, cavity]) = inherited();
    assert_eq!(*registry.artifact(cavity).unwrap(), 0.02);

    registry.write(settings, "temperature", 0.05).unwrap();
    assert_eq!(registry.read(qubit, "temperature").unwrap(), &Value::Float(0.05));
    assert_eq!(*registry.artifact(cavity).unwrap(), 0.05);
}

#[test]
fn test_write_on_source_invalidates_every_mirror() {
    let (mut registry, [settings, qubit, cavity]) = inherited();
    registry.artifact(qubit).unwrap();
    registry.artifact(cavity).unwrap();

    registry.write(settings, "temperature", 0.1).unwrap();
    assert!(registry.object(qubit).unwrap().node().is_dirty());
    assert!(registry.object(cavity).unwrap().node().is_dirty());
}

#[test]
fn test_direct_write_breaks_binding_for_good() {
    let (mut registry, [settings, qubit, cavity]) = inherited();

    registry.write(qubit, "temperature", 0.3).unwrap();
    assert_eq!(registry.cell(qubit, "temperature").unwrap().binding(), &Binding::Broken);
    assert_eq!(registry.read(qubit, "temperature").unwrap(), &Value::Float(0.3));
    // cavity still mirrors qubit, and so now sees the local value
    assert_eq!(registry.read(cavity, "temperature").unwrap(), &Value::Float(0.3));

    registry.write(settings, "temperature", 0.9).unwrap();
    assert_eq!(registry.read(qubit, "temperature").unwrap(), &Value::Float(0.3));
    assert_eq!(*registry.artifact(cavity).unwrap(), 0.3);
}

#[test]
fn test_binding_to_missing_cell_falls_back_to_local() {
    let mut registry: Registry<()> = Registry::new();
    let settings = registry.create_plain("settings").unwrap();
    let qubit = registry.create_leaf("qubit", 2).unwrap();

    registry.write(qubit, "detuning", 0.5).unwrap();
    registry
        .bind(qubit, "detuning", CellRef::new(settings, "detuning"))
        .unwrap();
    assert_eq!(registry.read(qubit, "detuning").unwrap(), &Value::Float(0.5));

    registry.write(settings, "detuning", 1.5).unwrap();
    assert_eq!(registry.read(qubit, "detuning").unwrap(), &Value::Float(1.5));
}

#[test]
fn test_binding_cycles_are_rejected() {
    let (mut registry, [settings, _, cavity]) = inherited();
    let err = registry
        .bind(settings, "temperature", CellRef::new(cavity, "temperature"))
        .unwrap_err();
    assert_eq!(
        err,
        SimError::Config(ConfigError::BindingCycle {
            cell: CellRef::new(settings, "temperature")
        })
    );
    assert!(registry.read(cavity, "temperature").is_ok());
}

#[test]
fn test_swept_cell_stays_detached_after_run() {
    for execution in [ExecutionConfig::sequential(), ExecutionConfig::parallel(2)] {
        let (registry, [settings, qubit, cavity]) = inherited();
        let mut simulation = Simulation::new(registry);
        simulation
            .add_axis(SweepAxis::new(qubit, "temperature", vec![1.0.into(), 2.0.into()]))
            .unwrap();
        simulation.set_execution(execution).unwrap();

        let results = simulation
            .run(|registry, _| Ok(scalar("t", *registry.artifact(cavity)?)))
            .unwrap();
        assert_eq!(results.at("t", &[0]).unwrap(), Some(&[1.0][..]));
        assert_eq!(results.at("t", &[1]).unwrap(), Some(&[2.0][..]));

        // back to the pre-run value, but no longer linked to settings
        let registry = simulation.registry_mut();
        assert_eq!(registry.cell(qubit, "temperature").unwrap().binding(), &Binding::Broken);
        assert_eq!(registry.read(qubit, "temperature").unwrap(), &Value::Float(0.02));
        assert_eq!(registry.mirror_count(&CellRef::new(settings, "temperature")), 0);

        registry.write(settings, "temperature", 9.0).unwrap();
        assert_eq!(registry.read(qubit, "temperature").unwrap(), &Value::Float(0.02));
        assert_eq!(*registry.artifact(cavity).unwrap(), 0.02);
    }
}
