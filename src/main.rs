//! Calibrig - Main Entry Point
//!
//! Assembles the standard camera/projector rig, restores the previous
//! session from the platform data directory when one exists, runs a seed
//! calibration pass and persists the world back to disk.

use calibrig::graph::{default_world_path, NodeRegistry, World};
use calibrig::nodes::{
    self, BoardDetection, Camera, CameraIntrinsics, Checkerboard, CorrespondenceSweep, Projector,
    ProjectorExtrinsics, Summary,
};
use calibrig::solve::SeedSolver;
use nalgebra::{Point2, Point3};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,calibrig=trace")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Calibrig");

    let mut registry = NodeRegistry::new();
    nodes::register_builtins(&mut registry);

    // Standard rig: one camera, one projector, a checkerboard target, the
    // two calibration procedures and a summary view.
    let mut world = World::new();
    let camera_id = world.add(Box::new(Camera::new()));
    let projector_id = world.add(Box::new(Projector::new()));
    let board_id = world.add(Box::new(Checkerboard::new()));
    let intrinsics_id = world.add(Box::new(CameraIntrinsics::new()));
    let extrinsics_id = world.add(Box::new(ProjectorExtrinsics::new()));
    world.add(Box::new(Summary::new()));

    world.connect(intrinsics_id, camera_id)?;
    world.connect(intrinsics_id, board_id)?;
    world.connect(extrinsics_id, camera_id)?;
    world.connect(extrinsics_id, projector_id)?;
    world.connect(extrinsics_id, board_id)?;

    let world_path = default_world_path()
        .ok_or_else(|| anyhow::anyhow!("no platform data directory available"))?;

    if world_path.exists() {
        tracing::info!("Restoring previous session from {:?}", world_path);
        let report = world.load_all(&world_path, &registry)?;
        tracing::info!("{}", report);
    } else {
        tracing::info!("No previous session, seeding calibration data");
        seed_calibration(&mut world, intrinsics_id, extrinsics_id, camera_id)?;
    }

    let ticks = world.update();
    if ticks.failed > 0 {
        tracing::warn!("{} of {} nodes failed to update", ticks.failed, ticks.ticked);
    }

    world.save_all(&world_path)?;
    Ok(())
}

/// Feed synthetic detections through both procedures so a fresh session
/// starts with a plausible, solved rig.
fn seed_calibration(
    world: &mut World,
    intrinsics_id: calibrig::graph::NodeId,
    extrinsics_id: calibrig::graph::NodeId,
    camera_id: calibrig::graph::NodeId,
) -> anyhow::Result<()> {
    let board_id = world
        .iter()
        .find(|(_, node)| node.type_name() == nodes::checkerboard::TYPE_NAME)
        .map(|(id, _)| id)
        .ok_or_else(|| anyhow::anyhow!("board node missing"))?;
    let board_points = world
        .get_as::<Checkerboard>(board_id)
        .map(|b| b.object_points())
        .unwrap_or_default();
    let image_size = (1920.0, 1080.0);

    let intrinsics = world
        .get_as_mut::<CameraIntrinsics>(intrinsics_id)
        .ok_or_else(|| anyhow::anyhow!("intrinsics node missing"))?;
    for view in 0..3 {
        let offset = 40.0 * view as f64;
        let image_points = board_points
            .iter()
            .map(|p| Point2::new(400.0 + offset + p.x * 8000.0, 300.0 + offset + p.y * 8000.0))
            .collect();
        intrinsics.add_capture(BoardDetection {
            image_points,
            object_points: board_points.clone(),
            image_width: image_size.0,
            image_height: image_size.1,
        });
    }
    let solved = intrinsics.calibrate(&SeedSolver)?;

    let camera = world
        .get_as_mut::<Camera>(camera_id)
        .ok_or_else(|| anyhow::anyhow!("camera node missing"))?;
    camera.set_intrinsics(solved.model.clone());

    let extrinsics = world
        .get_as_mut::<ProjectorExtrinsics>(extrinsics_id)
        .ok_or_else(|| anyhow::anyhow!("extrinsics node missing"))?;
    extrinsics.add_capture(CorrespondenceSweep {
        world_points: vec![
            Point3::new(-0.5, 0.0, 2.0),
            Point3::new(0.5, 0.0, 2.0),
            Point3::new(0.0, 0.5, 2.0),
            Point3::new(0.0, -0.5, 2.0),
        ],
        projector_points: vec![
            Point2::new(400.0, 540.0),
            Point2::new(1520.0, 540.0),
            Point2::new(960.0, 200.0),
            Point2::new(960.0, 880.0),
        ],
    });
    let pose = extrinsics.calibrate(&SeedSolver, &solved.model)?;

    let projector = world
        .iter()
        .find_map(|(id, node)| {
            if node.type_name() == nodes::projector::TYPE_NAME {
                Some(id)
            } else {
                None
            }
        })
        .ok_or_else(|| anyhow::anyhow!("projector node missing"))?;
    if let Some(projector) = world.get_as_mut::<Projector>(projector) {
        projector.set_extrinsics(&pose.pose);
    }
    Ok(())
}
