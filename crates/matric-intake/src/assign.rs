//! Counselor assignment policies.

use std::sync::atomic::{AtomicUsize, Ordering};

use matric_core::staff::StaffUser;

/// Chooses the counselor-of-record for an incoming lead from the current
/// eligible set (active admins and managers, ascending id).
pub trait AssignmentPolicy: Send + Sync {
  fn pick(&self, counselors: &[StaffUser]) -> Option<i64>;
}

impl<P: AssignmentPolicy + ?Sized> AssignmentPolicy for Box<P> {
  fn pick(&self, counselors: &[StaffUser]) -> Option<i64> {
    (**self).pick(counselors)
  }
}

/// Always the lowest-id eligible counselor. The historical behaviour, and
/// the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstActive;

impl AssignmentPolicy for FirstActive {
  fn pick(&self, counselors: &[StaffUser]) -> Option<i64> {
    counselors.first().map(|u| u.id)
  }
}

/// Cycles through eligible counselors so load spreads evenly. The cursor is
/// process-local; it resets on restart.
#[derive(Debug, Default)]
pub struct RoundRobin {
  cursor: AtomicUsize,
}

impl RoundRobin {
  pub fn new() -> Self { Self::default() }
}

impl AssignmentPolicy for RoundRobin {
  fn pick(&self, counselors: &[StaffUser]) -> Option<i64> {
    if counselors.is_empty() {
      return None;
    }
    let i = self.cursor.fetch_add(1, Ordering::Relaxed) % counselors.len();
    Some(counselors[i].id)
  }
}
