//! Headless frame loop: input events in, simulation state out.

use approx::assert_relative_eq;
use winterscape::{
    AnchorSpec, Animation, CameraMode, FrameTime, InputEvent, KeyCode, LightId, ModelSpec,
    PlacementSpec, RenderContext, RenderMode, SceneDescription, Vec2, Vec3, ViewerConfig,
};

fn tap(code: KeyCode) -> [InputEvent; 2] {
    [
        InputEvent::Key {
            code,
            pressed: true,
        },
        InputEvent::Key {
            code,
            pressed: false,
        },
    ]
}

fn frame(n: u64) -> FrameTime {
    FrameTime::new(n as f32 / 60.0, 1.0 / 60.0, n)
}

#[test]
fn starting_state() {
    let ctx = RenderContext::new(&ViewerConfig::default()).unwrap();

    assert!(ctx.lighting.light(LightId::Sun).switch.is_on());
    assert!(ctx.lighting.light(LightId::Lantern).switch.is_on());
    assert!(ctx.lighting.light(LightId::Campfire).switch.is_on());
    assert!(!ctx.lighting.fog.switch.is_on());
    assert!(!ctx.snow.is_enabled());
    assert_eq!(ctx.controller.mode(), CameraMode::FreeFly);
    assert_eq!(ctx.render_mode, RenderMode::Solid);
    assert_eq!(ctx.camera_position(), Vec3::new(0.0, 0.0, 3.0));
}

#[test]
fn snow_and_tour_follow_the_circle() {
    let mut ctx = RenderContext::new(&ViewerConfig::default()).unwrap();
    let capacity = ctx.snow.capacity();
    assert!(capacity > 0);

    let commands: Vec<_> = tap(KeyCode::KeyN)
        .into_iter()
        .chain(tap(KeyCode::KeyP))
        .collect();
    ctx.begin_frame(commands, frame(0));

    assert!(ctx.snow.is_enabled());
    assert_eq!(ctx.controller.mode(), CameraMode::Tour);

    // First tour frame sits at angle 0.
    let start = ctx.camera_position();
    assert_relative_eq!(start.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(start.y, 10.0);
    assert_relative_eq!(start.z, 30.0, epsilon = 1e-5);

    let mut previous: Vec<[f32; 4]> = ctx.snow.positions().to_vec();
    for n in 1..240 {
        ctx.begin_frame([], frame(n));

        let p = ctx.camera_position();
        assert_relative_eq!(p.x * p.x + p.z * p.z, 900.0, max_relative = 1e-4);
        assert_relative_eq!(p.y, 10.0);

        let positions = ctx.snow.positions();
        assert_eq!(positions.len(), capacity);
        assert_ne!(positions, previous.as_slice());
        previous = positions.to_vec();
    }

    // 240 frames at 0.5° per frame
    assert_relative_eq!(ctx.controller.tour.angle, 120.0, epsilon = 1e-3);
}

#[test]
fn snow_stays_inside_its_volume() {
    let mut ctx = RenderContext::new(&ViewerConfig::default()).unwrap();
    ctx.begin_frame(tap(KeyCode::KeyN), frame(0));

    let bounds = *ctx.snow.bounds();
    // Long frames push many particles past the floor.
    for n in 1..120 {
        ctx.begin_frame([], FrameTime::new(n as f32 * 0.5, 0.5, n));
        for p in ctx.snow.particles() {
            assert!(p.position.y >= bounds.floor);
            assert!(p.position.y <= bounds.max_height);
            assert!(p.position.x.abs() <= bounds.half_extent);
            assert!(p.position.z.abs() <= bounds.half_extent);
        }
    }
}

#[test]
fn disabled_snow_does_not_move() {
    let mut ctx = RenderContext::new(&ViewerConfig::default()).unwrap();
    let before = ctx.snow.positions().to_vec();
    for n in 0..10 {
        ctx.begin_frame([], frame(n));
    }
    assert_eq!(ctx.snow.positions(), before.as_slice());
}

#[test]
fn switching_lights_off_blackens_their_uniforms() {
    let mut ctx = RenderContext::new(&ViewerConfig::default()).unwrap();
    let events: Vec<_> = tap(KeyCode::KeyL)
        .into_iter()
        .chain(tap(KeyCode::KeyC))
        .chain(tap(KeyCode::KeyT))
        .collect();
    ctx.begin_frame(events, frame(30));

    let uniforms = ctx.lighting_uniforms();
    assert_eq!(&uniforms.sun_color[..3], &[0.0; 3]);
    assert_eq!(&uniforms.lantern_color[..3], &[0.0; 3]);
    assert_eq!(&uniforms.campfire_color[..3], &[0.0; 3]);
    assert!(!ctx.lighting.sun_enabled());
}

#[test]
fn leaving_the_tour_keeps_the_camera_where_it_was() {
    let mut ctx = RenderContext::new(&ViewerConfig::default()).unwrap();
    ctx.begin_frame(tap(KeyCode::KeyP), frame(0));
    for n in 1..30 {
        ctx.begin_frame([], frame(n));
    }
    let toured = ctx.camera_position();

    ctx.begin_frame(tap(KeyCode::KeyP), frame(30));
    assert_eq!(ctx.controller.mode(), CameraMode::FreeFly);
    assert_eq!(ctx.camera_position(), toured);
}

#[test]
fn custom_placement_table_spins_its_child() {
    let mut config = ViewerConfig::default();
    config.scene = SceneDescription {
        models: vec![ModelSpec {
            name: "mill".into(),
            path: "models/windmill/windmill.obj".into(),
        }],
        placements: vec![
            PlacementSpec {
                name: "base".into(),
                model: "mill".into(),
                position: [4.0, 0.0, -2.0],
                ..Default::default()
            },
            PlacementSpec {
                name: "sails".into(),
                model: "mill".into(),
                anchor: Some(AnchorSpec {
                    parent: "base".into(),
                    offset: [0.0, 3.0, 0.5],
                }),
                axis: [0.0, 0.0, 1.0],
                animation: Animation::Spin(2.0),
                ..Default::default()
            },
        ],
        ..config.scene
    };

    let mut ctx = RenderContext::new(&config).unwrap();
    for n in 0..5 {
        ctx.begin_frame([], frame(n));
    }

    assert_eq!(ctx.scene.find("base").unwrap().angle, 0.0);
    assert_relative_eq!(ctx.scene.find("sails").unwrap().angle, 10.0);
    let hub = ctx.scene.model_matrix(1).w_axis;
    assert_relative_eq!(hub.x, 4.0);
    assert_relative_eq!(hub.y, 3.0);
    assert_relative_eq!(hub.z, -1.5);
}

#[test]
fn mouse_look_is_not_bounded_by_the_window() {
    let mut ctx = RenderContext::new(&ViewerConfig::default()).unwrap();
    let start = ctx.controller.camera.yaw;
    ctx.begin_frame([InputEvent::MouseMotion(Vec2::ZERO)], frame(0));

    // A cursor pinned at the window edge would stop here; raw motion keeps going.
    for n in 1..=60 {
        ctx.begin_frame([InputEvent::MouseMotion(Vec2::new(-80.0, 0.0))], frame(n));
    }
    assert_relative_eq!(ctx.controller.camera.yaw, start - 480.0, epsilon = 1e-2);
}
