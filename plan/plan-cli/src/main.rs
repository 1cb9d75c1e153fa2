//! `armplan`: plan a collision-free joint path for a serial arm.
//!
//! Wires the full stack together: chain description → collision model →
//! occupancy grid (+ object list) → action space → lattice → BFS heuristic
//! → anytime weighted-A* search. Prints the waypoint path and the planner
//! statistics map; exits non-zero on bad input or planner failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nalgebra::{Point3, Vector3};
use tracing::info;

use collide_robot::{CollisionSpace, JointSpec, RobotCollisionModel};
use collide_sphere::{SphereSpec, SphereTree};
use grid_dist::{OccupancyGrid, PropagationDistanceField};
use plan_action::{load_primitive_file, ActionSpace};
use plan_chain::{load_chain_file, ChainJointKind, SerialChain};
use plan_heuristic::BfsHeuristic;
use plan_lattice::{LatticePlanningSpace, ManipLattice};
use plan_search::{AnytimeAStar, SearchConfig};
use plan_types::{GoalConstraint, PlanningParams, Pose, RobotModel};

/// Search-based motion planner for serial arms.
#[derive(Debug, Parser)]
#[command(name = "armplan", version, about)]
struct Args {
    /// Chain description file (joints, links, limits).
    #[arg(long)]
    chain: PathBuf,

    /// Motion-primitive file.
    #[arg(long)]
    primitives: PathBuf,

    /// Object list file of axis-aligned boxes (optional).
    #[arg(long)]
    objects: Option<PathBuf>,

    /// Goal pose of the planning link: x y z roll pitch yaw.
    #[arg(long, num_args = 6, allow_hyphen_values = true)]
    goal: Vec<f64>,

    /// Start configuration, radians (defaults to all zeros).
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    start: Option<Vec<f64>>,

    /// Override the planning link (defaults to the chain tip).
    #[arg(long)]
    planning_link: Option<String>,

    /// Name of the frame planning happens in.
    #[arg(long, default_value = "map")]
    planning_frame: String,

    /// Allowed planning time, seconds.
    #[arg(long, default_value_t = 10.0)]
    allowed_time: f64,

    /// Workspace minimum corner: x y z.
    #[arg(long, num_args = 3, allow_hyphen_values = true, default_values_t = [-1.5, -1.5, -1.5])]
    grid_origin: Vec<f64>,

    /// Workspace extent, meters: x y z.
    #[arg(long, num_args = 3, default_values_t = [3.0, 3.0, 3.0])]
    grid_size: Vec<f64>,

    /// Grid resolution, meters.
    #[arg(long, default_value_t = 0.02)]
    resolution: f64,

    /// Distance-field propagation cap, meters.
    #[arg(long, default_value_t = 0.4)]
    max_dist: f64,

    /// Radius of the spheres covering each link, meters.
    #[arg(long, default_value_t = 0.05)]
    link_radius: f64,

    /// Joint discretization, degrees.
    #[arg(long, default_value_t = 3.0)]
    discretization_deg: f64,

    /// Goal position tolerance per axis, meters.
    #[arg(long, default_value_t = 0.02)]
    pos_tolerance: f64,

    /// Goal orientation tolerance per axis, radians.
    #[arg(long, default_value_t = 0.1)]
    rot_tolerance: f64,

    /// Enable the snap-to-goal IK primitive.
    #[arg(long)]
    snap: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let chain = load_chain_file(&args.chain)
        .with_context(|| format!("loading chain {}", args.chain.display()))?;
    let chain = match &args.planning_link {
        Some(link) => chain.with_planning_link(link)?,
        None => chain,
    };
    info!(
        joints = chain.joint_count(),
        planning_link = chain.planning_link(),
        frame = %args.planning_frame,
        "loaded chain"
    );

    // Occupancy grid over the workspace, with world obstacles stamped in.
    let field = PropagationDistanceField::new(
        Point3::new(args.grid_origin[0], args.grid_origin[1], args.grid_origin[2]),
        Vector3::new(args.grid_size[0], args.grid_size[1], args.grid_size[2]),
        args.resolution,
        args.max_dist,
    )?;
    let mut grid = OccupancyGrid::new(field).with_reference_frame(args.planning_frame.clone());
    if let Some(path) = &args.objects {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading object file {}", path.display()))?;
        let boxes = parse_object_list(&text)?;
        info!(count = boxes.len(), "adding world objects");
        for (center, extents) in boxes {
            grid.add_box(center, extents);
        }
    }

    // The heuristic snapshots walls before the robot is stamped in; the
    // whole chain is one collision group, so nothing else enters the grid.
    let heuristic = BfsHeuristic::new(&grid, 100, args.link_radius);

    let model = collision_model_from_chain(&chain, args.link_radius)?;
    let continuous: Vec<bool> = (0..chain.joint_count())
        .map(|j| chain.is_continuous(j))
        .collect();
    let checker = CollisionSpace::new(grid, model, "manip", continuous)?;

    let params = PlanningParams::new(chain.joint_count())
        .with_uniform_discretization(args.discretization_deg.to_radians())
        .with_allowed_time(Duration::from_secs_f64(args.allowed_time));
    let mut actions = ActionSpace::new(&params);
    actions.add_primitives(load_primitive_file(&args.primitives, true)?);
    if args.snap {
        actions.set_enabled(plan_types::MotionPrimitiveKind::SnapToXyzRpy, true);
    }

    let lattice = ManipLattice::new(
        Box::new(chain.clone()),
        Box::new(checker),
        actions,
        params.clone(),
    )?;
    let mut space = LatticePlanningSpace::new(lattice, heuristic);

    if args.goal.len() != 6 {
        bail!("--goal needs exactly six values: x y z roll pitch yaw");
    }
    let goal_pose = Pose::new(
        args.goal[0],
        args.goal[1],
        args.goal[2],
        args.goal[3],
        args.goal[4],
        args.goal[5],
    );
    space.set_goal(GoalConstraint::pose(
        goal_pose,
        [args.pos_tolerance; 3],
        [args.rot_tolerance; 3],
    ))?;

    let start = args
        .start
        .clone()
        .unwrap_or_else(|| vec![0.0; chain.joint_count()]);
    let start_id = space.lattice_mut().set_start(&start)?;

    let mut planner = AnytimeAStar::new();
    let config = SearchConfig {
        initial_epsilon: params.initial_epsilon,
        final_epsilon: params.final_epsilon,
        epsilon_decrement: params.epsilon_decrement,
        allowed_time: params.allowed_time,
    };
    let (solution, stats) = planner.search(&mut space, start_id, &config)?;
    let path = space.lattice().extract_path(&solution.path)?;

    println!("# waypoints: {}", path.len());
    for waypoint in &path {
        let joined = waypoint
            .iter()
            .map(|v| format!("{v:.4}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{joined}");
    }
    println!("# statistics");
    for (name, value) in stats.to_map() {
        println!("# {name}: {value}");
    }
    Ok(())
}

/// Builds a collision model mirroring the chain: every link is covered by
/// a line of spheres from its frame toward the next joint's origin, and
/// the whole chain forms one collision group named `manip`.
fn collision_model_from_chain(
    chain: &SerialChain,
    radius: f64,
) -> Result<Arc<RobotCollisionModel>> {
    let joints = chain.joints();
    let mut builder = RobotCollisionModel::builder("chain_base");
    let mut link_names = Vec::new();
    let mut parent = "chain_base".to_owned();

    for (i, joint) in joints.iter().enumerate() {
        let spec = match joint.kind {
            ChainJointKind::Continuous => {
                JointSpec::continuous(&joint.name, joint.origin, *joint.axis)
            }
            ChainJointKind::Revolute { .. } => {
                JointSpec::revolute(&joint.name, joint.origin, *joint.axis)
            }
            ChainJointKind::Prismatic { .. } => {
                JointSpec::prismatic(&joint.name, joint.origin, *joint.axis)
            }
        };
        builder = builder.add_link(&joint.link, &parent, spec);

        // Cover the segment from this link frame to the next joint's
        // origin (or one radius of stub for the tip link).
        let segment = joints
            .get(i + 1)
            .map_or(Vector3::new(radius, 0.0, 0.0), |next| {
                next.origin.translation.vector
            });
        let tree = segment_sphere_tree(&joint.link, segment, radius)?;
        builder = builder.attach_spheres(&joint.link, tree);

        link_names.push(joint.link.clone());
        parent = joint.link.clone();
    }

    let names: Vec<&str> = link_names.iter().map(String::as_str).collect();
    let model = builder.add_group("manip", &names).build()?;
    Ok(Arc::new(model))
}

/// A line of spheres covering a segment from the origin.
fn segment_sphere_tree(link: &str, segment: Vector3<f64>, radius: f64) -> Result<SphereTree> {
    let length = segment.norm();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = ((length / radius).ceil() as usize).max(1);
    let leaves = (0..=count)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let t = k as f64 / count as f64;
            SphereSpec::new(
                format!("{link}_s{k}"),
                Point3::from(segment * t),
                radius,
            )
        })
        .collect();
    Ok(SphereTree::build(leaves)?)
}

/// Parses the object list: a count line, then `<id> <x> <y> <z> <dx>
/// <dy> <dz>` per object.
fn parse_object_list(text: &str) -> Result<Vec<(Point3<f64>, Vector3<f64>)>> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let count: usize = lines
        .next()
        .and_then(|l| l.trim().parse().ok())
        .context("object file must start with an object count")?;

    let mut boxes = Vec::with_capacity(count);
    for i in 0..count {
        let line = lines
            .next()
            .with_context(|| format!("object file ends after {i} of {count} objects"))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 {
            bail!("object line {} has {} fields, expected 7", i + 1, fields.len());
        }
        let nums: Vec<f64> = fields[1..]
            .iter()
            .map(|f| f.parse())
            .collect::<std::result::Result<_, _>>()
            .with_context(|| format!("object line {} has a malformed number", i + 1))?;
        boxes.push((
            Point3::new(nums[0], nums[1], nums[2]),
            Vector3::new(nums[3], nums[4], nums[5]),
        ));
    }
    Ok(boxes)
}
