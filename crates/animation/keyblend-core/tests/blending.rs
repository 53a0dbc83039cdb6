use std::sync::Arc;

use glam::DVec3;
use keyblend_core::{
    Controller, Keyframe, KeyframeSequence, PlayOptions, Pose, PoseTransforms, TrackId, Transform,
};

fn approx_vec(a: DVec3, b: DVec3) {
    assert!((a - b).length() < 1e-9, "expected {b:?}, got {a:?}");
}

fn still(name: &str, bone: &str, position: DVec3) -> Arc<KeyframeSequence> {
    let mut kf = Keyframe::new("hold", 0.0);
    kf.add_pose(
        bone,
        Pose::new(bone).with_transform(Transform::from_translation(position)),
        None,
    )
    .unwrap();
    Arc::new(KeyframeSequence::new(name, false, vec![kf]))
}

fn start(c: &mut Controller, id: TrackId, weight: f64) {
    c.play(
        id,
        PlayOptions::new()
            .with_transition_time(0.0)
            .with_weight(weight),
    )
    .unwrap();
}

/// it should fold tracks sequentially, so load order changes the result
#[test]
fn accumulation_is_sequential_and_order_dependent() {
    let a = still("A", "Arm", DVec3::new(1.0, 0.0, 0.0));
    let b = still("B", "Arm", DVec3::new(0.0, 1.0, 0.0));

    let mut ab = Controller::default();
    let ta = ab.load_track(a.clone()).unwrap();
    let tb = ab.load_track(b.clone()).unwrap();
    start(&mut ab, ta, 1.0);
    start(&mut ab, tb, 1.0);
    let out = ab.step(0.1, None);
    approx_vec(out["Arm"].position, DVec3::new(0.25, 0.5, 0.0));

    let mut ba = Controller::default();
    let tb = ba.load_track(b).unwrap();
    let ta = ba.load_track(a).unwrap();
    start(&mut ba, tb, 1.0);
    start(&mut ba, ta, 1.0);
    let out = ba.step(0.1, None);
    approx_vec(out["Arm"].position, DVec3::new(0.5, 0.25, 0.0));
}

/// it should floor the weight denominator at 1 so a lone light track stays partial
#[test]
fn denominator_floor_keeps_single_track_partial() {
    let mut c = Controller::default();
    let id = c.load_track(still("A", "Arm", DVec3::new(1.0, 0.0, 0.0))).unwrap();
    start(&mut c, id, 0.3);
    let out = c.step(0.0, None);
    approx_vec(out["Arm"].position, DVec3::new(0.3, 0.0, 0.0));
}

/// it should scale every track by weight / total when the total exceeds 1
#[test]
fn heavy_tracks_share_the_blend() {
    let mut c = Controller::default();
    let id = c.load_track(still("A", "Arm", DVec3::new(4.0, 0.0, 0.0))).unwrap();
    let other = c.load_track(still("B", "Leg", DVec3::new(0.0, 4.0, 0.0))).unwrap();
    start(&mut c, id, 3.0);
    start(&mut c, other, 1.0);
    let out = c.step(0.0, None);
    approx_vec(out["Arm"].position, DVec3::new(3.0, 0.0, 0.0));
    approx_vec(out["Leg"].position, DVec3::new(0.0, 1.0, 0.0));
}

/// it should blend onward from a carried-over mapping instead of identity
#[test]
fn carry_over_seeds_the_output() {
    let mut c = Controller::default();
    let id = c.load_track(still("A", "Arm", DVec3::new(1.0, 0.0, 0.0))).unwrap();
    start(&mut c, id, 0.5);

    let mut carry = PoseTransforms::new();
    carry.insert("Arm".into(), Transform::from_translation(DVec3::new(2.0, 0.0, 0.0)));
    carry.insert("Head".into(), Transform::from_translation(DVec3::Z));
    let out = c.step(0.0, Some(carry));
    approx_vec(out["Arm"].position, DVec3::new(1.5, 0.0, 0.0));
    approx_vec(out["Head"].position, DVec3::Z);
}

/// it should ramp pose weight with the raw segment ratio
#[test]
fn pose_weight_ramps_between_keyframes() {
    let target = Transform::from_translation(DVec3::new(2.0, 0.0, 0.0));
    let mut a = Keyframe::new("a", 0.0);
    a.add_pose("Arm", Pose::new("Arm").with_transform(target).with_weight(0.0), None)
        .unwrap();
    let mut b = Keyframe::new("b", 1.0);
    b.add_pose("Arm", Pose::new("Arm").with_transform(target), None)
        .unwrap();

    let mut c = Controller::default();
    let id = c
        .load_track(Arc::new(KeyframeSequence::new("ramp", false, vec![a, b])))
        .unwrap();
    start(&mut c, id, 1.0);
    let out = c.step(0.5, None);
    approx_vec(out["Arm"].position, DVec3::new(1.0, 0.0, 0.0));
}

/// it should report the blended mapping through the stepped signal
#[test]
fn stepped_signal_sees_final_transforms() {
    use std::sync::Mutex;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut c = Controller::default();
    {
        let seen = seen.clone();
        c.stepped.subscribe(move |evt| {
            seen.lock()
                .unwrap()
                .push((evt.delta_time, evt.transforms.len()));
        });
    }
    let id = c.load_track(still("A", "Arm", DVec3::X)).unwrap();
    start(&mut c, id, 1.0);
    let out = c.step(0.25, None);
    assert_eq!(out.len(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![(0.25, 1)]);
}

/// it should hold a bone missing from the next keyframe at its last known pose
#[test]
fn bone_missing_on_the_right_sustains_left_pose() {
    let mut a = Keyframe::new("a", 0.0);
    a.add_pose("Arm", Pose::new("Arm"), None).unwrap();
    let leg = Pose::new("Leg").with_transform(Transform::from_translation(DVec3::Y));
    a.add_pose("Leg", leg, None).unwrap();
    let mut b = Keyframe::new("b", 1.0);
    let arm = Pose::new("Arm").with_transform(Transform::from_translation(DVec3::X));
    b.add_pose("Arm", arm, None).unwrap();

    let mut c = Controller::default();
    let id = c
        .load_track(Arc::new(KeyframeSequence::new("drop", false, vec![a, b])))
        .unwrap();
    start(&mut c, id, 1.0);
    let out = c.step(0.5, None);

    approx_vec(out["Arm"].position, DVec3::new(0.5, 0.0, 0.0));
    approx_vec(out["Leg"].position, DVec3::Y);
    let cached = c.cached_pose("Leg").unwrap();
    assert_eq!(cached.keyframe().name, "a");
    assert_eq!(cached.pose().unwrap().name, "Leg");
}
