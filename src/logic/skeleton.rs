//! Skeleton Data Types
//!
//! Joint identifiers, 3D points, per-tick skeleton frames and the
//! correction vectors produced from them.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// JOINTS
// ============================================================================

/// Skeleton joint identifier (24-joint sensor skeleton)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Head,
    Neck,
    Torso,
    Waist,
    LeftCollar,
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    LeftHand,
    LeftFingertip,
    RightCollar,
    RightShoulder,
    RightElbow,
    RightWrist,
    RightHand,
    RightFingertip,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    LeftFoot,
    RightHip,
    RightKnee,
    RightAnkle,
    RightFoot,
}

impl Joint {
    pub const COUNT: usize = 24;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Head,
        Joint::Neck,
        Joint::Torso,
        Joint::Waist,
        Joint::LeftCollar,
        Joint::LeftShoulder,
        Joint::LeftElbow,
        Joint::LeftWrist,
        Joint::LeftHand,
        Joint::LeftFingertip,
        Joint::RightCollar,
        Joint::RightShoulder,
        Joint::RightElbow,
        Joint::RightWrist,
        Joint::RightHand,
        Joint::RightFingertip,
        Joint::LeftHip,
        Joint::LeftKnee,
        Joint::LeftAnkle,
        Joint::LeftFoot,
        Joint::RightHip,
        Joint::RightKnee,
        Joint::RightAnkle,
        Joint::RightFoot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::Head => "head",
            Joint::Neck => "neck",
            Joint::Torso => "torso",
            Joint::Waist => "waist",
            Joint::LeftCollar => "left_collar",
            Joint::LeftShoulder => "left_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::LeftHand => "left_hand",
            Joint::LeftFingertip => "left_fingertip",
            Joint::RightCollar => "right_collar",
            Joint::RightShoulder => "right_shoulder",
            Joint::RightElbow => "right_elbow",
            Joint::RightWrist => "right_wrist",
            Joint::RightHand => "right_hand",
            Joint::RightFingertip => "right_fingertip",
            Joint::LeftHip => "left_hip",
            Joint::LeftKnee => "left_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::LeftFoot => "left_foot",
            Joint::RightHip => "right_hip",
            Joint::RightKnee => "right_knee",
            Joint::RightAnkle => "right_ankle",
            Joint::RightFoot => "right_foot",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// POINT
// ============================================================================

/// 3D point or displacement, sensor coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(v: [f64; 3]) -> Self {
        Point3::new(v[0], v[1], v[2])
    }
}

// ============================================================================
// FRAMES
// ============================================================================

/// Tracked subject (user) identifier assigned by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub u32);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subject#{}", self.0)
    }
}

/// One sensor tick for one subject
///
/// Joints are kept ordered so iteration (and therefore notification order)
/// is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonFrame {
    timestamp: DateTime<Utc>,
    subject: SubjectId,
    joints: BTreeMap<Joint, Point3>,
}

impl SkeletonFrame {
    pub fn new(subject: SubjectId, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            subject,
            joints: BTreeMap::new(),
        }
    }

    /// Builder-style joint insertion; a repeated joint replaces the old point
    pub fn with_joint(mut self, joint: Joint, point: Point3) -> Self {
        self.joints.insert(joint, point);
        self
    }

    pub fn from_joints<I>(subject: SubjectId, timestamp: DateTime<Utc>, joints: I) -> Self
    where
        I: IntoIterator<Item = (Joint, Point3)>,
    {
        Self {
            timestamp,
            subject,
            joints: joints.into_iter().collect(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn joint(&self, joint: Joint) -> Option<Point3> {
        self.joints.get(&joint).copied()
    }

    pub fn joints(&self) -> impl Iterator<Item = (Joint, Point3)> + '_ {
        self.joints.iter().map(|(j, p)| (*j, *p))
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }
}

// ============================================================================
// CORRECTION VECTOR
// ============================================================================

/// Bias correction computed for one joint of one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionVector {
    pub joint: Joint,
    pub point: Point3,
    pub correction: Point3,
}

impl CorrectionVector {
    pub fn new(joint: Joint, point: Point3, correction: Point3) -> Self {
        Self { joint, point, correction }
    }

    /// Original point with the correction applied
    pub fn corrected(&self) -> Point3 {
        self.point + self.correction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_joint_lookup() {
        let frame = SkeletonFrame::new(SubjectId(1), Utc::now())
            .with_joint(Joint::Head, Point3::new(0.0, 1.7, 2.0))
            .with_joint(Joint::LeftHand, Point3::new(-0.4, 1.0, 1.8))
            .with_joint(Joint::Head, Point3::new(0.0, 1.6, 2.0));

        assert_eq!(frame.joint_count(), 2);
        assert_eq!(frame.joint(Joint::Head), Some(Point3::new(0.0, 1.6, 2.0)));
        assert_eq!(frame.joint(Joint::RightFoot), None);
    }

    #[test]
    fn test_joint_iteration_is_ordered() {
        let frame = SkeletonFrame::from_joints(
            SubjectId(3),
            Utc::now(),
            vec![
                (Joint::RightFoot, Point3::ZERO),
                (Joint::Head, Point3::ZERO),
                (Joint::Torso, Point3::ZERO),
            ],
        );
        let order: Vec<Joint> = frame.joints().map(|(j, _)| j).collect();
        assert_eq!(order, vec![Joint::Head, Joint::Torso, Joint::RightFoot]);
    }

    #[test]
    fn test_correction_vector_applies_delta() {
        let cv = CorrectionVector::new(
            Joint::Neck,
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(0.5, -0.5, 0.0),
        );
        assert_eq!(cv.corrected(), Point3::new(1.5, 1.5, 3.0));
    }

    #[test]
    fn test_joint_names_roundtrip_through_serde() {
        let json = serde_json::to_string(&Joint::LeftFingertip).unwrap();
        assert_eq!(json, "\"left_fingertip\"");
        for joint in Joint::ALL {
            let parsed: Joint = serde_json::from_str(&format!("\"{}\"", joint)).unwrap();
            assert_eq!(parsed, joint);
        }
    }
}
