use shatter::{EffectConfig, ShatterEffect};

const DT: f64 = 1.0 / 60.0;

fn run(fx: &mut ShatterEffect, ticks: u32) {
    for _ in 0..ticks {
        fx.tick(DT);
    }
}

#[test]
fn scattered_shards_approach_their_scatter_targets() {
    let cfg = EffectConfig {
        rows: 4,
        cols: 4,
        surface_width: 400,
        surface_height: 400,
        initial_assembled: true,
        ..EffectConfig::default()
    };
    let mut fx = ShatterEffect::with_seed(cfg, None, 21).unwrap();

    fx.toggle();
    run(&mut fx, 600);

    for shard in fx.shards() {
        let d = (shard.position - shard.scatter_target.position).hypot();
        assert!(d < 0.5, "shard still {d} units from its scatter target");
        let r = (shard.rotation - shard.scatter_target.rotation).abs();
        assert!(r < 0.01, "shard still {r} rad from its scatter tilt");
    }
}

#[test]
fn reassembly_settles_within_three_hundred_ticks() {
    let cfg = EffectConfig {
        rows: 4,
        cols: 4,
        surface_width: 400,
        surface_height: 400,
        initial_assembled: true,
        ..EffectConfig::default()
    };
    let mut fx = ShatterEffect::with_seed(cfg, None, 22).unwrap();

    // Fully scatter first so reassembly starts from displaced, tilted
    // shards with residual velocity.
    fx.toggle();
    run(&mut fx, 600);

    fx.toggle();
    run(&mut fx, 300);

    for shard in fx.shards() {
        let d = (shard.position - shard.cell.centroid).hypot();
        assert!(d < 1.0, "shard settled {d} units from its home position");
        assert!(
            shard.rotation.abs() < 0.01,
            "shard settled {} rad off axis",
            shard.rotation
        );
    }
}

#[test]
fn staggered_scatter_starts_cascade_over_time() {
    let cfg = EffectConfig {
        rows: 6,
        cols: 6,
        surface_width: 400,
        surface_height: 400,
        initial_assembled: true,
        ..EffectConfig::default()
    };
    let mut fx = ShatterEffect::with_seed(cfg, None, 23).unwrap();

    fx.toggle();
    let total = fx.pending_retargets();
    assert_eq!(total, fx.shard_count());

    // A single tick only releases the first few starts of the cascade.
    fx.tick(DT);
    let remaining = fx.pending_retargets();
    assert!(remaining > 0, "the whole cascade fired in one tick");
    assert!(remaining < total, "nothing fired on the first tick");

    run(&mut fx, 120);
    assert_eq!(fx.pending_retargets(), 0);
}

#[test]
fn large_timestep_does_not_destabilize_the_spring() {
    let cfg = EffectConfig {
        rows: 3,
        cols: 3,
        surface_width: 400,
        surface_height: 400,
        initial_assembled: true,
        ..EffectConfig::default()
    };
    let mut fx = ShatterEffect::with_seed(cfg, None, 24).unwrap();
    fx.toggle();

    // Irregular host cadence: a dropped-frame spike every fourth tick.
    for i in 0..400 {
        let dt = if i % 4 == 0 { 0.1 } else { DT };
        fx.tick(dt);
    }
    for shard in fx.shards() {
        let d = (shard.position - shard.scatter_target.position).hypot();
        assert!(d < 5.0, "spring diverged under irregular timesteps: {d}");
    }
}
