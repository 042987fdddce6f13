//! The `CrmStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `matric-store-sqlite`).
//! Higher layers (`matric-server`, `matric-intake`, `matric-mailer`) depend
//! on this abstraction, not on any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::{
  activity::{ActivityLog, NewActivity},
  directory::{Country, Tag},
  document::{NewDocument, StudentDocument},
  email::{Audience, EmailLog, NewEmailLog},
  lead::{IntakeOutcome, Lead, LeadDraft},
  staff::{NewStaff, StaffRole, StaffUser},
  student::{ApplicationStatus, NewStudent, StatusPolicy, Student},
};

/// Directory listing page size.
pub const STUDENTS_PAGE_SIZE: usize = 12;
/// Leads listing page size.
pub const LEADS_PAGE_SIZE: usize = 25;

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`CrmStore::search_students`].
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
  /// Free-text filter over name, course, email, phone, and passport number.
  pub text:       Option<String>,
  pub country_id: Option<i64>,
  pub tag_id:     Option<i64>,
  pub status:     Option<ApplicationStatus>,
  /// `None` means the default view: non-archived only.
  pub archived:   Option<bool>,
  /// 1-based page number; out-of-range values clamp to the nearest page.
  pub page:       usize,
}

/// Parameters for [`CrmStore::list_staff`].
#[derive(Debug, Clone, Default)]
pub struct StaffQuery {
  /// Free-text filter over username, name, and email.
  pub text:   Option<String>,
  pub role:   Option<StaffRole>,
  pub active: Option<bool>,
}

/// One page of a listing, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items:       Vec<T>,
  pub page:        usize,
  pub total_pages: usize,
  pub total:       usize,
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Dashboard aggregates, shaped for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
  /// Country names, most-populated first; students without a country appear
  /// under `"Unknown"`.
  pub countries:       Vec<String>,
  pub country_counts:  Vec<usize>,
  pub lead_labels:     Vec<String>,
  pub lead_counts:     Vec<usize>,
  /// Students created within the last 30 days.
  pub recent_students: usize,
  pub total_students:  usize,
  pub total_leads:     usize,
}

/// Per-status application counts shown on the applications listing.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStats {
  pub total_apps:         usize,
  pub pending_count:      usize,
  pub under_review_count: usize,
  pub approved_count:     usize,
  pub rejected_count:     usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Matric storage backend.
///
/// Referential actions (cascade, null-on-delete) are the backend's
/// responsibility and follow the policy stated on each entity type.
/// `ingest_lead` must be atomic: either every write of one intake commits or
/// none do.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CrmStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Students ──────────────────────────────────────────────────────────

  /// Persist a new student. Sets `consent_timestamp` when `consent_given`
  /// is already true at creation.
  fn create_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// Replace the form-editable fields of a student and bump `updated_at`.
  ///
  /// `consent_timestamp` is written only on the first true `consent_given`;
  /// later saves never touch it.
  fn update_student(
    &self,
    id: i64,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Assign a new application status, validated against `policy`.
  fn set_application_status(
    &self,
    id: i64,
    status: ApplicationStatus,
    policy: StatusPolicy,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Soft-delete: set the archived flag. The record survives.
  fn archive_student(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Hard delete. Cascades documents and activity rows; leads and email
  /// logs keep their rows with the student reference nulled.
  fn delete_student(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn search_students<'a>(
    &'a self,
    query: &'a StudentQuery,
  ) -> impl Future<Output = Result<Page<Student>, Self::Error>> + Send + 'a;

  /// Exact-match lookup; returns the oldest match (ascending id) if several
  /// students share the number. No normalisation is applied.
  fn find_student_by_phone<'a>(
    &'a self,
    phone: &'a str,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + 'a;

  /// Exact-match lookup by email; same semantics as the phone lookup.
  fn find_student_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + 'a;

  // ── Reference data ────────────────────────────────────────────────────

  /// Get-or-create a country by exact name. Safe to race: concurrent calls
  /// for the same name resolve to one row.
  fn ensure_country<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Country, Self::Error>> + Send + 'a;

  fn list_countries(
    &self,
  ) -> impl Future<Output = Result<Vec<Country>, Self::Error>> + Send + '_;

  /// Delete a country; student references are nulled, students survive.
  fn delete_country(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Get-or-create a tag by exact name; same race guarantee as countries.
  fn ensure_tag<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + 'a;

  /// Attach a tag to a student. Attaching twice is a no-op.
  fn tag_student(
    &self,
    student_id: i64,
    tag_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn student_tags(
    &self,
    student_id: i64,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  /// Delete a tag; only the student associations are removed with it.
  fn delete_tag(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Record an upload. The store assigns the dated storage path from the
  /// upload timestamp.
  fn add_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<StudentDocument, Self::Error>> + Send + '_;

  fn list_documents(
    &self,
    student_id: i64,
  ) -> impl Future<Output = Result<Vec<StudentDocument>, Self::Error>> + Send + '_;

  // ── Leads ─────────────────────────────────────────────────────────────

  /// The intake transaction: resolve the student by phone then email,
  /// create one (with country and lead-source tag) on a miss, persist the
  /// lead row and the `lead_created` activity entry. All writes commit
  /// together or not at all.
  fn ingest_lead(
    &self,
    draft: LeadDraft,
  ) -> impl Future<Output = Result<IntakeOutcome, Self::Error>> + Send + '_;

  fn get_lead(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  /// Newest first, [`LEADS_PAGE_SIZE`] per page.
  fn list_leads(
    &self,
    page: usize,
  ) -> impl Future<Output = Result<Page<Lead>, Self::Error>> + Send + '_;

  fn mark_lead_processed(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Staff ─────────────────────────────────────────────────────────────

  fn add_staff(
    &self,
    input: NewStaff,
  ) -> impl Future<Output = Result<StaffUser, Self::Error>> + Send + '_;

  fn get_staff(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<StaffUser>, Self::Error>> + Send + '_;

  fn list_staff<'a>(
    &'a self,
    query: &'a StaffQuery,
  ) -> impl Future<Output = Result<Vec<StaffUser>, Self::Error>> + Send + 'a;

  /// Active staff eligible for lead assignment, ascending id.
  fn active_counselors(
    &self,
  ) -> impl Future<Output = Result<Vec<StaffUser>, Self::Error>> + Send + '_;

  /// Delete a staff account. References from students (`created_by`), leads
  /// (`assigned_to`), and activity rows are nulled.
  fn delete_staff(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Activity log ──────────────────────────────────────────────────────

  fn log_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<ActivityLog, Self::Error>> + Send + '_;

  /// Most recent activity rows for one student.
  fn student_activity(
    &self,
    student_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActivityLog>, Self::Error>> + Send + '_;

  // ── Email log ─────────────────────────────────────────────────────────

  fn append_email_log(
    &self,
    input: NewEmailLog,
  ) -> impl Future<Output = Result<EmailLog, Self::Error>> + Send + '_;

  fn recent_email_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<EmailLog>, Self::Error>> + Send + '_;

  /// Non-archived students with a non-empty email matching the selector,
  /// ascending id.
  fn broadcast_audience<'a>(
    &'a self,
    audience: &'a Audience,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + 'a;

  // ── Aggregates ────────────────────────────────────────────────────────

  fn dashboard_stats(
    &self,
  ) -> impl Future<Output = Result<DashboardStats, Self::Error>> + Send + '_;

  fn application_stats(
    &self,
  ) -> impl Future<Output = Result<ApplicationStats, Self::Error>> + Send + '_;
}
