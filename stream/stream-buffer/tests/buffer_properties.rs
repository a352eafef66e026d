//! Invariant suite for the acquisition buffer.
//!
//! Each test pins one of the buffer's externally observable guarantees:
//! UID monotonicity, filtered-time monotonicity, the capacity bound,
//! round-trip fidelity of admissions, the three temporal retrieval modes,
//! interpolation endpoint/midpoint behavior, validity propagation, format
//! rejection, and ring wrap-around.

// Allow test-specific patterns
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::float_cmp)]
#![allow(clippy::cast_precision_loss)]

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Rotation3, Vector3};

use stream_buffer::{BufferError, RetrievalMode, StreamBuffer, VideoFrameInput};
use stream_types::{
    FieldMap, FrameFormat, FrameSize, ImageOrientation, ImageType, PixelType, ToolStatus,
};

fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

fn rotation_z_deg(angle_deg: f64) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(
        Rotation3::from_axis_angle(&Vector3::z_axis(), angle_deg.to_radians()).matrix(),
    );
    m
}

fn pose_buffer(timestamps: &[f64]) -> StreamBuffer {
    let buffer = StreamBuffer::new();
    for (i, &t) in timestamps.iter().enumerate() {
        buffer
            .add_pose(
                &Matrix4::identity(),
                ToolStatus::Ok,
                i as u64,
                Some(t),
                Some(t),
                None,
            )
            .unwrap()
            .unwrap();
    }
    buffer
}

#[test]
fn monotonic_contiguous_uids() {
    let buffer = StreamBuffer::new();
    let mut last_uid = None;
    for i in 0..20u64 {
        let uid = buffer
            .add_pose(
                &Matrix4::identity(),
                ToolStatus::Ok,
                i,
                Some(0.1 * i as f64),
                Some(0.1 * i as f64),
                None,
            )
            .unwrap()
            .unwrap();
        if let Some(last) = last_uid {
            assert_eq!(uid, last + 1, "UIDs must increase by exactly one");
        }
        last_uid = Some(uid);
    }
    assert_eq!(buffer.oldest_uid(), Some(0));
    assert_eq!(buffer.latest_uid(), Some(19));
}

#[test]
fn monotonic_filtered_time_across_uids() {
    let buffer = pose_buffer(&[0.0, 0.5, 0.9, 1.4, 2.0]);
    let oldest = buffer.oldest_uid().unwrap();
    let latest = buffer.latest_uid().unwrap();

    let mut previous = f64::MIN;
    for uid in oldest..=latest {
        let ts = buffer.uid_to_timestamp(uid).unwrap();
        assert!(ts > previous, "filtered timestamps must increase with UID");
        previous = ts;
    }
}

#[test]
fn capacity_bound_holds_under_overflow() {
    let buffer = StreamBuffer::new();
    buffer.set_capacity(8).unwrap();

    for i in 0..100u64 {
        buffer
            .add_pose(
                &Matrix4::identity(),
                ToolStatus::Ok,
                i,
                Some(i as f64),
                Some(i as f64),
                None,
            )
            .unwrap();
        let oldest = buffer.oldest_uid().unwrap();
        let latest = buffer.latest_uid().unwrap();
        assert!(latest - oldest + 1 <= 8);
        assert_eq!(buffer.len(), usize::try_from(latest - oldest + 1).unwrap());
    }
}

#[test]
fn uid_round_trip_preserves_every_field() {
    let buffer = StreamBuffer::new();
    let matrix = translation(1.0, 2.0, 3.0);
    let mut fields = FieldMap::new();
    fields.set("Operator", "A");
    fields.set("ProbeToTrackerTransform", "1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1");

    let uid = buffer
        .add_pose(
            &matrix,
            ToolStatus::OutOfVolume,
            41,
            Some(0.93),
            Some(1.0),
            Some(&fields),
        )
        .unwrap()
        .unwrap();

    let item = buffer.get_by_uid(uid).unwrap();
    assert_eq!(item.uid(), uid);
    assert_eq!(item.index(), 41);
    assert_eq!(item.status(), ToolStatus::OutOfVolume);
    assert_eq!(item.filtered_timestamp(0.0), 1.0);
    assert_eq!(item.unfiltered_timestamp(0.0), 0.93);
    assert_relative_eq!(*item.matrix(), matrix, epsilon = 1e-15);
    assert_eq!(item.fields().get("Operator"), Some("A"));
    assert!(item.has_valid_transform());
}

#[test]
fn closest_time_is_idempotent_for_admitted_items() {
    let timestamps = [0.0, 0.4, 1.1, 1.15, 2.8];
    let buffer = pose_buffer(&timestamps);

    for (i, &t) in timestamps.iter().enumerate() {
        let item = buffer.get_by_time(t, RetrievalMode::Closest).unwrap();
        assert_eq!(item.uid(), i as u64, "closest({t}) must return the item itself");
        assert_eq!(item.filtered_timestamp(0.0), t);
    }
}

#[test]
fn exact_mode_boundary() {
    let buffer = pose_buffer(&[0.0, 1.0, 2.0]);

    // Within the negligible window (10 microseconds).
    let item = buffer.get_by_time(1.0 + 5e-6, RetrievalMode::Exact).unwrap();
    assert_eq!(item.uid(), 1);

    // Beyond it.
    let err = buffer.get_by_time(1.0 + 2e-5, RetrievalMode::Exact).unwrap_err();
    assert!(matches!(err, BufferError::NoExactMatch { .. }));
}

#[test]
fn interpolation_endpoints_return_the_items() {
    let buffer = StreamBuffer::new();
    buffer
        .add_pose(&translation(1.0, 0.0, 0.0), ToolStatus::Ok, 0, Some(1.0), Some(1.0), None)
        .unwrap();
    buffer
        .add_pose(&rotation_z_deg(90.0), ToolStatus::Ok, 1, Some(2.0), Some(2.0), None)
        .unwrap();

    let at_a = buffer.get_by_time(1.0, RetrievalMode::Interpolated).unwrap();
    assert_eq!(at_a.uid(), 0);
    assert_relative_eq!(*at_a.matrix(), translation(1.0, 0.0, 0.0), epsilon = 1e-12);

    let at_b = buffer.get_by_time(2.0, RetrievalMode::Interpolated).unwrap();
    assert_eq!(at_b.uid(), 1);
    assert_relative_eq!(*at_b.matrix(), rotation_z_deg(90.0), epsilon = 1e-12);
}

#[test]
fn interpolation_midpoint_rotation() {
    let buffer = StreamBuffer::new();
    buffer
        .add_pose(&Matrix4::identity(), ToolStatus::Ok, 0, Some(1.0), Some(1.0), None)
        .unwrap();
    buffer
        .add_pose(&rotation_z_deg(180.0), ToolStatus::Ok, 1, Some(2.0), Some(2.0), None)
        .unwrap();

    let mid = buffer.get_by_time(1.5, RetrievalMode::Interpolated).unwrap();
    assert_relative_eq!(*mid.matrix(), rotation_z_deg(90.0), epsilon = 1e-10);
    assert_eq!(mid.filtered_timestamp(0.0), 1.5);
    assert_relative_eq!(mid.unfiltered_timestamp(0.0), 1.5, epsilon = 1e-12);
}

#[test]
fn interpolation_midpoint_translation() {
    let buffer = StreamBuffer::new();
    buffer
        .add_pose(&translation(0.0, 0.0, 0.0), ToolStatus::Ok, 0, Some(1.0), Some(1.0), None)
        .unwrap();
    buffer
        .add_pose(&translation(10.0, 0.0, 0.0), ToolStatus::Ok, 1, Some(2.0), Some(2.0), None)
        .unwrap();

    let mid = buffer.get_by_time(1.5, RetrievalMode::Interpolated).unwrap();
    assert_relative_eq!(mid.matrix()[(0, 3)], 5.0, epsilon = 1e-12);
    assert_relative_eq!(mid.matrix()[(1, 3)], 0.0, epsilon = 1e-12);
    assert_relative_eq!(mid.matrix()[(2, 3)], 0.0, epsilon = 1e-12);
}

#[test]
fn interpolation_near_half_turn_still_returns() {
    // 179 degrees apart: the warning threshold is exceeded on both sides,
    // but the midpoint result is still produced.
    let buffer = StreamBuffer::new();
    buffer
        .add_pose(&Matrix4::identity(), ToolStatus::Ok, 0, Some(1.0), Some(1.0), None)
        .unwrap();
    buffer
        .add_pose(&rotation_z_deg(179.0), ToolStatus::Ok, 1, Some(2.0), Some(2.0), None)
        .unwrap();

    let mid = buffer.get_by_time(1.5, RetrievalMode::Interpolated).unwrap();
    assert_relative_eq!(*mid.matrix(), rotation_z_deg(89.5), epsilon = 1e-9);
}

#[test]
fn validity_propagates_through_interpolation() {
    let buffer = StreamBuffer::new();
    buffer
        .add_pose(&translation(1.0, 0.0, 0.0), ToolStatus::Ok, 0, Some(1.0), Some(1.0), None)
        .unwrap();
    buffer
        .add_pose(&translation(2.0, 0.0, 0.0), ToolStatus::OutOfView, 1, Some(2.0), Some(2.0), None)
        .unwrap();

    // Interpolation cannot use the invalid neighbor; the closest item is
    // substituted with status Missing.
    let item = buffer.get_by_time(1.6, RetrievalMode::Interpolated).unwrap();
    assert_eq!(item.status(), ToolStatus::Missing);
    assert_eq!(item.filtered_timestamp(0.0), 1.6);
}

#[test]
fn format_rejection_leaves_buffer_unchanged() {
    let buffer = StreamBuffer::new();
    buffer
        .set_frame_format(FrameFormat::new(
            FrameSize::new(8, 8, 1),
            PixelType::U8,
            1,
            ImageType::Brightness,
            ImageOrientation::Mf,
        ))
        .unwrap();

    let good = vec![0u8; 64];
    buffer
        .add_video(
            &VideoFrameInput {
                bytes: &good,
                orientation: ImageOrientation::Mf,
                size: FrameSize::new(8, 8, 1),
                pixel_type: PixelType::U8,
                components: 1,
                image_type: ImageType::Brightness,
                skip_bytes: 0,
            },
            0,
            None,
            Some(0.0),
            Some(1.0),
            None,
        )
        .unwrap()
        .unwrap();

    // Wrong size.
    let bad = vec![0u8; 16];
    let err = buffer
        .add_video(
            &VideoFrameInput {
                bytes: &bad,
                orientation: ImageOrientation::Mf,
                size: FrameSize::new(4, 4, 1),
                pixel_type: PixelType::U8,
                components: 1,
                image_type: ImageType::Brightness,
                skip_bytes: 0,
            },
            1,
            None,
            Some(1.0),
            Some(2.0),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, BufferError::FormatMismatch { .. }));

    // Wrong component count.
    let bad = vec![0u8; 128];
    let err = buffer
        .add_video(
            &VideoFrameInput {
                bytes: &bad,
                orientation: ImageOrientation::Mf,
                size: FrameSize::new(8, 8, 1),
                pixel_type: PixelType::U8,
                components: 2,
                image_type: ImageType::Brightness,
                skip_bytes: 0,
            },
            1,
            None,
            Some(1.0),
            Some(2.0),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, BufferError::FormatMismatch { .. }));

    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.latest_uid(), Some(0));
}

#[test]
fn wrap_around_window() {
    let buffer = StreamBuffer::new();
    buffer.set_capacity(4).unwrap();

    for i in 0..7u64 {
        buffer
            .add_pose(
                &Matrix4::identity(),
                ToolStatus::Ok,
                i,
                Some(i as f64),
                Some(i as f64),
                None,
            )
            .unwrap()
            .unwrap();
    }

    assert_eq!(buffer.oldest_uid(), Some(3));
    assert_eq!(buffer.latest_uid(), Some(6));

    assert!(matches!(
        buffer.get_by_uid(0).unwrap_err(),
        BufferError::NotAvailableAnymore { uid: 0 }
    ));
    assert!(matches!(
        buffer.get_by_uid(7).unwrap_err(),
        BufferError::NotAvailableYet { uid: 7 }
    ));
    for uid in 3..=6 {
        assert_eq!(buffer.get_by_uid(uid).unwrap().index(), uid);
    }
}

#[test]
fn concurrent_producer_and_consumers() {
    use std::sync::Arc;
    use std::thread;

    let buffer = Arc::new(StreamBuffer::new());
    buffer.set_capacity(32).unwrap();

    let producer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for i in 0..500u64 {
                buffer
                    .add_pose(
                        &translation(i as f64, 0.0, 0.0),
                        ToolStatus::Ok,
                        i,
                        Some(i as f64 * 1e-3),
                        Some(i as f64 * 1e-3),
                        None,
                    )
                    .unwrap();
            }
        })
    };

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for _ in 0..200 {
                    if let (Some(oldest), Some(latest)) = (buffer.oldest_uid(), buffer.latest_uid())
                    {
                        assert!(latest - oldest + 1 <= 32);
                        // Any item inside the window must read consistently.
                        if let Ok(item) = buffer.get_by_uid(latest) {
                            assert_eq!(item.matrix()[(0, 3)], item.index() as f64);
                        }
                    }
                }
            })
        })
        .collect();

    producer.join().unwrap();
    for consumer in consumers {
        consumer.join().unwrap();
    }
    assert_eq!(buffer.latest_uid(), Some(499));
}
