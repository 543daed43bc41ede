//! Closed-form trilateration.
//!
//! Given three anchors and three target distances, finds the point whose
//! distances to the anchors match the targets. Used at configuration time to
//! place the kite's control points from its bridle lengths.
//!
//! The computation runs in `f64`: control points sit a few decimetres from
//! their anchors and the residual must stay far below a millimetre.

use glam::{DVec3, Vec3};
use kitesim_types::constants::GEOMETRY_EPSILON;
use kitesim_types::{KiteError, KiteResult};

/// Result of a trilateration solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trilateration {
    /// Reconstructed point in the anchors' frame.
    pub point: DVec3,
    /// Radicand of the out-of-plane coordinate before clamping.
    ///
    /// Negative when the three spheres do not quite intersect; the point is
    /// then flattened onto the anchor plane.
    pub radicand: f64,
}

impl Trilateration {
    /// Returns true if the out-of-plane radicand had to be clamped to zero.
    pub fn flattened(&self) -> bool {
        self.radicand < 0.0
    }

    /// Largest absolute distance error against the given anchors and targets.
    pub fn residual(&self, anchors: [DVec3; 3], distances: [f64; 3]) -> f64 {
        anchors
            .iter()
            .zip(distances)
            .map(|(anchor, d)| (self.point.distance(*anchor) - d).abs())
            .fold(0.0, f64::max)
    }
}

/// Orthonormal frame spanned by three anchors.
struct AnchorFrame {
    origin: DVec3,
    ex: DVec3,
    ey: DVec3,
    ez: DVec3,
    /// |B − A|
    d: f64,
    /// Coordinates of C in the frame.
    i: f64,
    j: f64,
}

impl AnchorFrame {
    fn new(a: DVec3, b: DVec3, c: DVec3) -> KiteResult<Self> {
        if !(a.is_finite() && b.is_finite() && c.is_finite()) {
            return Err(KiteError::InvalidGeometry(
                "trilateration anchors must be finite".into(),
            ));
        }

        let ab = b - a;
        let d = ab.length();
        if d < GEOMETRY_EPSILON {
            return Err(KiteError::InvalidGeometry(
                "trilateration anchors A and B coincide".into(),
            ));
        }
        let ex = ab / d;

        let ac = c - a;
        let i = ex.dot(ac);
        let ey_raw = ac - ex * i;
        let ey_len = ey_raw.length();
        if ey_len < GEOMETRY_EPSILON * d.max(1.0) {
            return Err(KiteError::InvalidGeometry(
                "trilateration anchors are collinear".into(),
            ));
        }
        let ey = ey_raw / ey_len;
        let j = ey.dot(ac);

        Ok(Self {
            origin: a,
            ex,
            ey,
            ez: canonical_hemisphere(ex.cross(ey)),
            d,
            i,
            j,
        })
    }
}

/// Orients `n` toward +Z, breaking ties with +Y then +X, so that the root
/// choice is deterministic regardless of anchor order.
fn canonical_hemisphere(n: DVec3) -> DVec3 {
    let eps = GEOMETRY_EPSILON;
    let flip = if n.z.abs() > eps {
        n.z < 0.0
    } else if n.y.abs() > eps {
        n.y < 0.0
    } else {
        n.x < 0.0
    };
    if flip {
        -n
    } else {
        n
    }
}

fn check_distances(distances: [f64; 3]) -> KiteResult<()> {
    if distances.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return Err(KiteError::InvalidGeometry(format!(
            "trilateration distances must be finite and non-negative, got {distances:?}"
        )));
    }
    Ok(())
}

fn solve_in_frame(frame: &AnchorFrame, ra: f64, rb: f64, rc: f64) -> Trilateration {
    let AnchorFrame { d, i, j, .. } = *frame;

    let x = (ra * ra - rb * rb + d * d) / (2.0 * d);
    let y = (ra * ra - rc * rc + i * i + j * j) / (2.0 * j) - (i / j) * x;
    let radicand = ra * ra - x * x - y * y;
    let z = radicand.max(0.0).sqrt();

    Trilateration {
        point: frame.origin + frame.ex * x + frame.ey * y + frame.ez * z,
        radicand,
    }
}

/// Trilaterates in `f64`, picking the root in the canonical hemisphere.
pub fn trilaterate_f64(
    a: DVec3,
    b: DVec3,
    c: DVec3,
    ra: f64,
    rb: f64,
    rc: f64,
) -> KiteResult<Trilateration> {
    check_distances([ra, rb, rc])?;
    let frame = AnchorFrame::new(a, b, c)?;
    Ok(solve_in_frame(&frame, ra, rb, rc))
}

/// Trilaterates, picking the root on the side of `hint`.
///
/// Falls back to the canonical hemisphere when `hint` lies in the anchor plane.
pub fn trilaterate_toward(
    anchors: [Vec3; 3],
    distances: [f32; 3],
    hint: Vec3,
) -> KiteResult<Trilateration> {
    let [ra, rb, rc] = distances.map(f64::from);
    check_distances([ra, rb, rc])?;
    let [a, b, c] = anchors.map(|v| v.as_dvec3());
    let mut frame = AnchorFrame::new(a, b, c)?;

    let side = frame.ez.dot(hint.as_dvec3());
    if side < -GEOMETRY_EPSILON {
        frame.ez = -frame.ez;
    }
    Ok(solve_in_frame(&frame, ra, rb, rc))
}

/// Trilaterates single-precision anchors and distances.
///
/// The solve runs in `f64` and the result is rounded back to `f32`.
pub fn trilaterate(
    a: Vec3,
    b: Vec3,
    c: Vec3,
    ra: f32,
    rb: f32,
    rc: f32,
) -> KiteResult<Vec3> {
    let solution = trilaterate_f64(
        a.as_dvec3(),
        b.as_dvec3(),
        c.as_dvec3(),
        ra as f64,
        rb as f64,
        rc as f64,
    )?;
    Ok(solution.point.as_vec3())
}
