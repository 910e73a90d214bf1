use nalgebra::{UnitQuaternion, Vector3};
use spacetwin::disturbances::DisturbanceConfig;
use spacetwin::environment::{CentralBody, LocalEnvironment, SpacecraftDynamics, SpacecraftStructure};
use spacetwin::logger::{vector_header, vector_value};
use spacetwin::*;
use std::cell::Cell;
use std::rc::Rc;

struct Flags {
    attitude: bool,
    orbit: bool,
}

impl TimeAuthority for Flags {
    fn attitude_propagate_due(&self) -> bool {
        self.attitude
    }

    fn orbit_propagate_due(&self) -> bool {
        self.orbit
    }

    fn component_update_due(&self) -> bool {
        false
    }
}

const BOTH: Flags = Flags { attitude: true, orbit: true };
const NEITHER: Flags = Flags { attitude: false, orbit: false };

/// Model with fixed outputs that counts its updates.
struct Fixed {
    name: &'static str,
    enabled: bool,
    output: Vector3<f64>,
    updates: Rc<Cell<u32>>,
}

impl Fixed {
    fn new(output: Vector3<f64>) -> Self {
        Self {
            name: "fixed",
            enabled: true,
            output,
            updates: Rc::new(Cell::new(0)),
        }
    }
}

impl Disturbance for Fixed {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, _environment: &LocalEnvironment, _dynamics: &SpacecraftDynamics) {
        self.updates.set(self.updates.get() + 1);
    }

    fn as_loggable(&self) -> &dyn Loggable {
        self
    }
}

impl ForceTorqueModel for Fixed {
    fn force_b_n(&self) -> Vector3<f64> {
        self.output * 2.0
    }

    fn torque_b_nm(&self) -> Vector3<f64> {
        self.output
    }
}

impl AccelerationModel for Fixed {
    fn acceleration_i_m_s2(&self) -> Vector3<f64> {
        self.output
    }
}

impl Loggable for Fixed {
    fn log_header(&self) -> String {
        vector_header(self.name, "b", "Nm")
    }

    fn log_value(&self) -> String {
        vector_value(&self.output)
    }
}

fn snapshot() -> (LocalEnvironment, SpacecraftDynamics) {
    let structure = SpacecraftStructure::default();
    let mut dynamics = SpacecraftDynamics::new(
        &structure,
        Vector3::new(6.5e6, 1.5e6, 0.8e6),
        Vector3::new(-1.2e3, 7.1e3, 0.9e3),
    );
    dynamics.attitude_i2b = UnitQuaternion::from_euler_angles(0.3, 0.2, -0.4);
    let mut environment = LocalEnvironment::default();
    environment.update(&dynamics);
    (environment, dynamics)
}

fn earth_disturbances() -> Disturbances {
    Disturbances::from_config(
        &DisturbanceConfig::default(),
        &CentralBody::earth(),
        &SpacecraftStructure::default(),
        None,
    )
    .unwrap()
}

#[test]
fn test_totals_untouched_without_flags() {
    let (environment, dynamics) = snapshot();
    let mut disturbances = earth_disturbances();
    disturbances.update(&environment, &dynamics, &BOTH);
    let force = disturbances.total_force_b_n();
    let torque = disturbances.total_torque_b_nm();
    let acceleration = disturbances.total_acceleration_i_m_s2();

    let mut moved = dynamics.clone();
    moved.position_i_m *= 1.1;
    moved.attitude_i2b = UnitQuaternion::from_euler_angles(-1.0, 0.5, 0.0);
    disturbances.update(&environment, &moved, &NEITHER);

    assert_eq!(disturbances.total_force_b_n(), force);
    assert_eq!(disturbances.total_torque_b_nm(), torque);
    assert_eq!(disturbances.total_acceleration_i_m_s2(), acceleration);
}

#[test]
fn test_all_disabled_gives_exact_zero() {
    let (environment, dynamics) = snapshot();
    let mut disturbances = earth_disturbances();
    for name in disturbances.model_names() {
        disturbances.set_enabled(name, false);
    }

    disturbances.update(&environment, &dynamics, &BOTH);

    assert_eq!(disturbances.total_force_b_n(), Vector3::zeros());
    assert_eq!(disturbances.total_torque_b_nm(), Vector3::zeros());
    assert_eq!(disturbances.total_acceleration_i_m_s2(), Vector3::zeros());
}

#[test]
fn test_sum_follows_registration_order() {
    let (environment, dynamics) = snapshot();
    // Magnitudes chosen so that floating-point addition order matters
    let outputs = [
        Vector3::new(1.0e16, 0.1, -3.0),
        Vector3::new(1.0, 0.2, 1.0e-20),
        Vector3::new(-1.0e16, 0.3, 3.0),
        Vector3::new(1.0, 1.0e-17, 7.0),
    ];

    let mut builder = Disturbances::builder();
    for output in outputs {
        builder.add_force_torque_model(Box::new(Fixed::new(output))).unwrap();
        builder.add_acceleration_model(Box::new(Fixed::new(output))).unwrap();
    }
    let mut disturbances = builder.build();

    disturbances.update(&environment, &dynamics, &BOTH);

    let mut expected = Vector3::zeros();
    for output in outputs {
        expected += output;
    }
    assert_eq!(disturbances.total_torque_b_nm(), expected);
    assert_eq!(disturbances.total_acceleration_i_m_s2(), expected);
    assert_eq!(disturbances.total_force_b_n(), expected * 2.0);
}

#[test]
fn test_identical_inputs_give_identical_totals() {
    let (environment, dynamics) = snapshot();
    let mut first = earth_disturbances();
    let mut second = earth_disturbances();

    first.update(&environment, &dynamics, &BOTH);
    second.update(&environment, &dynamics, &BOTH);

    assert_eq!(first.total_force_b_n(), second.total_force_b_n());
    assert_eq!(first.total_torque_b_nm(), second.total_torque_b_nm());
    assert_eq!(first.total_acceleration_i_m_s2(), second.total_acceleration_i_m_s2());
}

#[test]
fn test_non_earth_body_omits_earth_only_models() {
    let (environment, dynamics) = snapshot();
    let mut disturbances = Disturbances::from_config(
        &DisturbanceConfig::default(),
        &CentralBody::new("MOON"),
        &SpacecraftStructure::default(),
        None,
    )
    .unwrap();

    assert_eq!(
        disturbances.model_names(),
        vec!["gravity_gradient", "solar_radiation_pressure", "third_body_gravity"]
    );

    disturbances.update(&environment, &dynamics, &BOTH);

    // Only solar radiation pressure produces force here, even with air around
    assert!(environment.air_density_kg_m3 > 0.0);
    let srp = disturbances
        .force_torque_models()
        .find(|m| m.name() == "solar_radiation_pressure")
        .unwrap();
    assert_eq!(disturbances.total_force_b_n(), Vector3::zeros() + srp.force_b_n());
}

#[test]
fn test_disabled_model_is_not_updated() {
    let (environment, dynamics) = snapshot();
    let active = Fixed::new(Vector3::new(1.0, 0.0, 0.0));
    let mut idle = Fixed::new(Vector3::new(0.0, 1.0, 0.0));
    idle.name = "idle";
    idle.enabled = false;
    let active_updates = Rc::clone(&active.updates);
    let idle_updates = Rc::clone(&idle.updates);

    let mut builder = Disturbances::builder();
    builder.add_force_torque_model(Box::new(active)).unwrap();
    builder.add_force_torque_model(Box::new(idle)).unwrap();
    let mut disturbances = builder.build();

    disturbances.update(&environment, &dynamics, &BOTH);
    disturbances.update(&environment, &dynamics, &Flags { attitude: true, orbit: false });

    assert_eq!(active_updates.get(), 2);
    assert_eq!(idle_updates.get(), 0);
}

#[test]
fn test_orbit_flag_does_not_update_force_torque_models() {
    let (environment, dynamics) = snapshot();
    let model = Fixed::new(Vector3::new(1.0, 2.0, 3.0));
    let updates = Rc::clone(&model.updates);

    let mut builder = Disturbances::builder();
    builder.add_force_torque_model(Box::new(model)).unwrap();
    let mut disturbances = builder.build();

    disturbances.update(&environment, &dynamics, &Flags { attitude: false, orbit: true });

    assert_eq!(updates.get(), 0);
    assert_eq!(disturbances.total_torque_b_nm(), Vector3::zeros());
}

#[test]
fn test_registry_capacity() {
    let mut builder = Disturbances::builder();
    for _ in 0..spacetwin::disturbances::MAX_DISTURBANCES {
        builder.add_acceleration_model(Box::new(Fixed::new(Vector3::zeros()))).unwrap();
    }

    let overflow = builder.add_acceleration_model(Box::new(Fixed::new(Vector3::zeros())));
    assert_eq!(overflow, Err(RegistryError::Full));
}

#[test]
fn test_log_setup_registers_every_model() {
    let disturbances = earth_disturbances();
    let mut logger = Logger::in_memory("disturbances.csv");

    disturbances.log_setup(&mut logger);

    assert_eq!(logger.headers().len(), 6);
    assert!(logger.header_line().starts_with("gravity_gradient_torque_b_x[Nm],"));
    assert!(logger.archived_files().is_empty());
}

#[test]
fn test_log_setup_archives_config_source() {
    let disturbances = Disturbances::from_config(
        &DisturbanceConfig::default(),
        &CentralBody::earth(),
        &SpacecraftStructure::default(),
        Some(std::path::Path::new("configs/case.json")),
    )
    .unwrap();
    let mut logger = Logger::in_memory("disturbances.csv");

    disturbances.log_setup(&mut logger);

    assert_eq!(logger.archived_files(), &[std::path::PathBuf::from("configs/case.json")]);
}
