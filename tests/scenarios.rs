use scanline_rt::renderer::hit_sphere;
use scanline_rt::{
    AmbientMode, Color, Framebuffer, Point3, RayTracer, Rgb8, RowStatus, Scene, SceneConfig,
    Vector3, CANVAS_COLOR,
};

fn head_on_scene() -> Scene {
    let mut scene = Scene::new();
    scene.reset_scene();
    scene
        .add_sphere(Point3::origin(), 1.0, Color::new(1.0, 0.0, 0.0), 0.2, 0.0, 1.0)
        .unwrap();
    scene.add_light(Color::WHITE, Point3::new(0.0, 0.0, 5.0)).unwrap();
    scene.set_ambient_light(Color::BLACK).unwrap();
    scene.set_background(Color::BLACK).unwrap();
    scene
        .set_camera(Point3::new(0.0, 0.0, 5.0), Point3::origin(), Vector3::y())
        .unwrap();
    scene.set_field_of_view(90.0).unwrap();
    scene
}

fn render(scene: &Scene, tracer: &RayTracer) -> Framebuffer {
    let mut framebuffer = Framebuffer::new(tracer.width(), tracer.height(), Rgb8::default());
    tracer.draw_scene(scene, &mut framebuffer).unwrap();
    framebuffer
}

#[test]
fn test_single_pixel_head_on_red() {
    let scene = head_on_scene();
    let tracer = RayTracer::new(1, 1, 1, 1).unwrap();
    let framebuffer = render(&scene, &tracer);

    let pixel = framebuffer.get(0, 0).unwrap();
    assert!(pixel.r > 0);
    assert_eq!(pixel.g, 0);
    assert_eq!(pixel.b, 0);
}

#[test]
fn test_empty_scene_is_background() {
    let mut scene = Scene::new();
    scene.reset_scene();
    scene.set_background(Color::new(0.0, 1.0, 0.0)).unwrap();

    for (w, h, sw, sh) in [(1, 1, 1, 1), (16, 9, 16, 9), (40, 30, 7, 5)] {
        let tracer = RayTracer::new(w, h, sw, sh).unwrap();
        let framebuffer = render(&scene, &tracer);
        assert!(framebuffer.pixels().iter().all(|p| *p == Rgb8::new(0, 255, 0)));
    }
}

#[test]
fn test_overlapping_spheres_nearest_wins() {
    let mut near_only = head_on_scene();
    near_only.reset_scene();
    near_only.add_light(Color::WHITE, Point3::new(0.0, 0.0, 5.0)).unwrap();
    near_only
        .add_sphere(Point3::new(0.0, 0.0, 0.5), 1.0, Color::new(0.0, 0.0, 1.0), 0.0, 0.0, 1.0)
        .unwrap();

    // far sphere added first so insertion order cannot decide the result
    let mut both = near_only.clone();
    both.reset_scene();
    both.add_light(Color::WHITE, Point3::new(0.0, 0.0, 5.0)).unwrap();
    both.add_sphere(Point3::new(0.0, 0.0, -0.5), 1.0, Color::new(1.0, 0.0, 0.0), 0.0, 0.0, 1.0)
        .unwrap();
    both.add_sphere(Point3::new(0.0, 0.0, 0.5), 1.0, Color::new(0.0, 0.0, 1.0), 0.0, 0.0, 1.0)
        .unwrap();

    let tracer = RayTracer::new(9, 9, 9, 9).unwrap();
    let ray = tracer.eye_ray(&both, 4, 4);
    assert_eq!(tracer.trace_ray(&both, &ray), tracer.trace_ray(&near_only, &ray));
    let center = render(&both, &tracer).get(4, 4).unwrap();
    assert!(center.b > 0);
    assert_eq!(center.r, 0);
}

#[test]
fn test_hit_parameter_matches_quadratic() {
    let scene = head_on_scene();
    let tracer = RayTracer::new(1, 1, 1, 1).unwrap();
    let ray = tracer.eye_ray(&scene, 0, 0);

    // eye at z = 5 on the axis, unit sphere at the origin: enters at z = 1
    let t = hit_sphere(&scene.spheres()[0], &ray);
    assert!((t - 4.0).abs() < 1e-12);
}

#[test]
fn test_ambient_scales_linearly_end_to_end() {
    let red_channel = |lights: usize| {
        let mut scene = Scene::new();
        scene
            .set_camera(Point3::new(0.0, 0.0, 5.0), Point3::origin(), Vector3::y())
            .unwrap();
        scene.set_ambient_light(Color::new(0.25, 0.25, 0.25)).unwrap();
        scene
            .add_sphere(Point3::origin(), 1.0, Color::WHITE, 0.4, 0.0, 1.0)
            .unwrap();
        for _ in 0..lights {
            scene.add_light(Color::WHITE, Point3::new(0.0, 0.0, -10.0)).unwrap();
        }
        let tracer = RayTracer::new(1, 1, 1, 1).unwrap();
        let ray = tracer.eye_ray(&scene, 0, 0);
        tracer.trace_ray(&scene, &ray).r
    };

    let one = red_channel(1);
    assert!((one - 0.1).abs() < 1e-12);
    assert!((red_channel(2) - 2.0 * one).abs() < 1e-12);
    assert!((red_channel(3) - 3.0 * one).abs() < 1e-12);
}

#[test]
fn test_ambient_once_mode_end_to_end() {
    let mut scene = head_on_scene();
    scene.set_ambient_light(Color::WHITE).unwrap();
    scene.add_light(Color::BLACK, Point3::new(0.0, 0.0, 5.0)).unwrap();

    let per_light = RayTracer::new(1, 1, 1, 1).unwrap();
    let once = per_light.clone().with_ambient_mode(AmbientMode::Once);
    let ray = per_light.eye_ray(&scene, 0, 0);

    let a = per_light.trace_ray(&scene, &ray);
    let b = once.trace_ray(&scene, &ray);
    assert!((a.r - b.r - 0.2).abs() < 1e-12);
}

#[test]
fn test_upscaling_is_blocky() {
    let mut scene = head_on_scene();
    scene.set_background(Color::new(0.0, 0.0, 1.0)).unwrap();
    let tracer = RayTracer::new(40, 40, 4, 4).unwrap();
    let framebuffer = render(&scene, &tracer);

    for j in 0..4 {
        for i in 0..4 {
            let (x, y, w, h) = tracer.footprint(i, j);
            let first = framebuffer.get(x, y).unwrap();
            for yy in y..y + h {
                for xx in x..x + w {
                    assert_eq!(framebuffer.get(xx, yy), Some(first));
                }
            }
        }
    }
    assert!(framebuffer.pixels().iter().all(|p| *p != CANVAS_COLOR));
}

#[test]
fn test_incremental_progress_is_observable() {
    let mut scene = head_on_scene();
    scene.set_background(Color::new(0.0, 0.0, 1.0)).unwrap();
    let tracer = RayTracer::new(20, 20, 10, 10).unwrap();
    let mut framebuffer = Framebuffer::new(20, 20, CANVAS_COLOR);
    let mut pass = tracer.begin(&scene);

    for expected in 0..5 {
        assert_eq!(pass.tick(&mut framebuffer), RowStatus::Rendered { row: expected });
    }
    let rendered = framebuffer.rows().take(10).all(|row| row.iter().all(|p| *p != CANVAS_COLOR));
    let pending = framebuffer.rows().skip(10).all(|row| row.iter().all(|p| *p == CANVAS_COLOR));
    assert!(rendered);
    assert!(pending);

    while let RowStatus::Rendered { .. } = pass.tick(&mut framebuffer) {}
    assert!(pass.is_done());
    assert_eq!(pass.stats().rows, 10);
}

#[test]
fn test_yaml_scene_end_to_end() {
    let yaml = r#"
render: { width: 8, height: 8, screen_width: 8, screen_height: 8 }
background: [0, 1, 0]
"#;
    let config: SceneConfig = serde_yaml::from_str(yaml).unwrap();
    let scene = config.build_scene().unwrap();
    let tracer = config.render.tracer().unwrap();
    let (framebuffer, stats) = tracer.render_parallel(&scene);

    assert_eq!(stats.hits, 0);
    assert!(framebuffer.pixels().iter().all(|p| *p == Rgb8::new(0, 255, 0)));
}

#[test]
fn test_bundled_scene_files_load() {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/scenes");

    let config = SceneConfig::from_file(format!("{dir}/three_spheres.yaml")).unwrap();
    assert_eq!(config.build_scene().unwrap(), Scene::demo());

    let config = SceneConfig::from_file(format!("{dir}/head_on.yaml")).unwrap();
    let scene = config.build_scene().unwrap();
    let (framebuffer, stats) = config.render.tracer().unwrap().render_parallel(&scene);
    assert_eq!(stats.hits, 1);
    assert!(framebuffer.pixels().iter().all(|p| p.r > 0 && p.g == 0 && p.b == 0));
}
