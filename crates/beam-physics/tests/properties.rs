//! Property tests for the canonical transform and the beam built from it.

use approx::assert_relative_eq;
use beam_physics::{
    Beam, CoordinateTransform, LabParticle, LongitudinalConvention, ParticleCloud, Species,
    M_ELECTRON,
};
use glam::DVec3;
use proptest::prelude::*;

const P0C: f64 = 1.0e7;

fn arb_particle() -> impl Strategy<Value = LabParticle> {
    (
        (-5.0e-3..5.0e-3_f64, -5.0e-3..5.0e-3_f64),
        (-5.0e4..5.0e4_f64, -5.0e4..5.0e4_f64, 0.9e7..1.1e7_f64),
        -1.0e-11..1.0e-11_f64,
    )
        .prop_map(|((x, y), (px, py, pz), t)| {
            LabParticle::new(DVec3::new(x, y, 0.0), DVec3::new(px, py, pz), t)
        })
}

fn arb_cloud() -> impl Strategy<Value = ParticleCloud> {
    prop::collection::vec(arb_particle(), 1..64)
        .prop_map(|particles| ParticleCloud::new(Species::Electron, particles))
}

fn arb_convention() -> impl Strategy<Value = LongitudinalConvention> {
    prop_oneof![
        Just(LongitudinalConvention::AheadPositive),
        Just(LongitudinalConvention::AheadNegative),
    ]
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 + 1e-6 * a.abs().max(b.abs())
}

proptest! {
    #[test]
    fn canonical_round_trip(cloud in arb_cloud(), convention in arb_convention()) {
        let transform = CoordinateTransform::default().with_convention(convention);
        let coordinates = transform.transform::<f64>(&cloud, P0C).unwrap();
        let beam = Beam::new(coordinates, 0.0, P0C, M_ELECTRON).unwrap();

        let lab = beam.to_lab(&transform, Species::Electron).unwrap();
        let again = transform.transform::<f64>(&lab, beam.p0c()).unwrap();

        for (row, (original, rebuilt)) in beam.coordinates().iter().zip(again.iter()).enumerate() {
            for column in 0..6 {
                prop_assert!(
                    close(original[column], rebuilt[column]),
                    "row {} column {}: {} vs {}", row, column, original[column], rebuilt[column]
                );
            }
        }
    }

    #[test]
    fn rows_follow_particle_order(cloud in arb_cloud()) {
        let coordinates = CoordinateTransform::default().transform::<f64>(&cloud, P0C).unwrap();
        prop_assert_eq!(coordinates.rows(), cloud.len());

        for (particle, row) in cloud.iter().zip(coordinates.iter()) {
            prop_assert_eq!(row[0], particle.position[0]);
            prop_assert_eq!(row[2], particle.position[1]);
            prop_assert_eq!(row[1], particle.momentum[0] / P0C);
            prop_assert_eq!(row[3], particle.momentum[1] / P0C);
        }
    }

    #[test]
    fn reference_momentum_scaling(cloud in arb_cloud(), k in 0.5..2.0_f64) {
        let transform = CoordinateTransform::default();
        let base = transform.transform::<f64>(&cloud, P0C).unwrap();
        let scaled = transform.transform::<f64>(&cloud, k * P0C).unwrap();

        for (a, b) in base.iter().zip(scaled.iter()) {
            prop_assert!(close(b[1], a[1] / k));
            prop_assert!(close(b[3], a[3] / k));
            // |p| = p0c (1 + pz) is fixed, so pz' = (1 + pz) / k - 1
            prop_assert!(close(b[5], (1.0 + a[5]) / k - 1.0));
            // Positions do not depend on the reference
            prop_assert_eq!(a[0], b[0]);
            prop_assert_eq!(a[4], b[4]);
        }
    }

    #[test]
    fn transform_is_idempotent(cloud in arb_cloud()) {
        let transform = CoordinateTransform::default();
        let first = transform.transform::<f32>(&cloud, P0C).unwrap();
        let second = transform.transform::<f32>(&cloud, P0C).unwrap();
        prop_assert_eq!(first.as_bytes(), second.as_bytes());
    }
}

#[test]
fn single_on_momentum_particle_is_origin_in_both_precisions() {
    let cloud = ParticleCloud::new(
        Species::Electron,
        vec![LabParticle::new(DVec3::ZERO, DVec3::new(0.0, 0.0, P0C), 0.0)],
    );
    let transform = CoordinateTransform::default();

    assert_eq!(transform.transform::<f32>(&cloud, P0C).unwrap().as_flat(), &[0.0_f32; 6]);
    assert_eq!(transform.transform::<f64>(&cloud, P0C).unwrap().as_flat(), &[0.0_f64; 6]);
}

#[test]
fn f32_beam_round_trips_within_single_precision() {
    let cloud = ParticleCloud::new(
        Species::Electron,
        vec![
            LabParticle::new(DVec3::new(1.0e-3, 0.0, 0.0), DVec3::new(1.0e4, 0.0, 1.02e7), 1.0e-12),
            LabParticle::new(DVec3::new(0.0, -1.0e-3, 0.0), DVec3::new(0.0, -1.0e4, 0.97e7), -3.0e-12),
        ],
    );
    let transform = CoordinateTransform::default();
    let beam = Beam::new(
        transform.transform::<f32>(&cloud, P0C).unwrap(),
        0.0,
        P0C as f32,
        M_ELECTRON as f32,
    )
    .unwrap();
    let again = transform
        .transform::<f32>(&beam.to_lab(&transform, Species::Electron).unwrap(), P0C)
        .unwrap();

    for (a, b) in beam.coordinates().as_flat().iter().zip(again.as_flat()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-5);
    }
}
