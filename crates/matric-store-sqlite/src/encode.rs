//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as ISO 8601 (`YYYY-MM-DD`).
//! Enum columns hold the same lowercase discriminants the wire formats use, so
//! every consumption site matches exhaustively through one decode function.

use chrono::{DateTime, NaiveDate, Utc};
use matric_core::{
  activity::ActivityLog,
  email::{EmailLog, EmailStatus},
  lead::{CampaignInfo, Lead, LeadSource},
  staff::{StaffRole, StaffUser},
  student::{ApplicationStatus, Gender, Student},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Gender ──────────────────────────────────────────────────────────────────

pub fn encode_gender(g: Gender) -> &'static str {
  match g {
    Gender::Male => "male",
    Gender::Female => "female",
    Gender::Other => "other",
  }
}

pub fn decode_gender(s: &str) -> Result<Gender> {
  match s {
    "male" => Ok(Gender::Male),
    "female" => Ok(Gender::Female),
    "other" => Ok(Gender::Other),
    other => Err(Error::Decode(format!("unknown gender: {other:?}"))),
  }
}

// ─── ApplicationStatus ───────────────────────────────────────────────────────

pub fn encode_status(s: ApplicationStatus) -> &'static str {
  match s {
    ApplicationStatus::Pending => "pending",
    ApplicationStatus::UnderReview => "under_review",
    ApplicationStatus::Approved => "approved",
    ApplicationStatus::Rejected => "rejected",
  }
}

pub fn decode_status(s: &str) -> Result<ApplicationStatus> {
  match s {
    "pending" => Ok(ApplicationStatus::Pending),
    "under_review" => Ok(ApplicationStatus::UnderReview),
    "approved" => Ok(ApplicationStatus::Approved),
    "rejected" => Ok(ApplicationStatus::Rejected),
    other => Err(Error::Decode(format!("unknown application status: {other:?}"))),
  }
}

// ─── LeadSource ──────────────────────────────────────────────────────────────

pub fn encode_source(s: LeadSource) -> &'static str {
  match s {
    LeadSource::Facebook => "facebook",
    LeadSource::Manual => "manual",
    LeadSource::Other => "other",
  }
}

pub fn decode_source(s: &str) -> Result<LeadSource> {
  match s {
    "facebook" => Ok(LeadSource::Facebook),
    "manual" => Ok(LeadSource::Manual),
    "other" => Ok(LeadSource::Other),
    other => Err(Error::Decode(format!("unknown lead source: {other:?}"))),
  }
}

// ─── EmailStatus ─────────────────────────────────────────────────────────────

pub fn encode_email_status(s: EmailStatus) -> &'static str {
  match s {
    EmailStatus::Sent => "sent",
    EmailStatus::Failed => "failed",
  }
}

pub fn decode_email_status(s: &str) -> Result<EmailStatus> {
  match s {
    "sent" => Ok(EmailStatus::Sent),
    "failed" => Ok(EmailStatus::Failed),
    other => Err(Error::Decode(format!("unknown email status: {other:?}"))),
  }
}

// ─── StaffRole ───────────────────────────────────────────────────────────────

pub fn encode_role(r: StaffRole) -> &'static str {
  match r {
    StaffRole::Admin => "admin",
    StaffRole::Manager => "manager",
    StaffRole::Staff => "staff",
  }
}

pub fn decode_role(s: &str) -> Result<StaffRole> {
  match s {
    "admin" => Ok(StaffRole::Admin),
    "manager" => Ok(StaffRole::Manager),
    "staff" => Ok(StaffRole::Staff),
    other => Err(Error::Decode(format!("unknown staff role: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawStudent::from_row`] field order.
pub const STUDENT_COLS: &str = "id, first_name, last_name, gender, age, \
  country_id, enrollment_date, phone, email, passport_number, visa_type, \
  visa_expiry, course, application_status, notes, consent_given, \
  consent_timestamp, created_by, archived, created_at, updated_at";

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub id:                 i64,
  pub first_name:         String,
  pub last_name:          String,
  pub gender:             Option<String>,
  pub age:                Option<i64>,
  pub country_id:         Option<i64>,
  pub enrollment_date:    Option<String>,
  pub phone:              String,
  pub email:              String,
  pub passport_number:    Option<String>,
  pub visa_type:          Option<String>,
  pub visa_expiry:        Option<String>,
  pub course:             Option<String>,
  pub application_status: String,
  pub notes:              String,
  pub consent_given:      bool,
  pub consent_timestamp:  Option<String>,
  pub created_by:         Option<i64>,
  pub archived:           bool,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawStudent {
      id:                 row.get(0)?,
      first_name:         row.get(1)?,
      last_name:          row.get(2)?,
      gender:             row.get(3)?,
      age:                row.get(4)?,
      country_id:         row.get(5)?,
      enrollment_date:    row.get(6)?,
      phone:              row.get(7)?,
      email:              row.get(8)?,
      passport_number:    row.get(9)?,
      visa_type:          row.get(10)?,
      visa_expiry:        row.get(11)?,
      course:             row.get(12)?,
      application_status: row.get(13)?,
      notes:              row.get(14)?,
      consent_given:      row.get(15)?,
      consent_timestamp:  row.get(16)?,
      created_by:         row.get(17)?,
      archived:           row.get(18)?,
      created_at:         row.get(19)?,
      updated_at:         row.get(20)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      id:                 self.id,
      first_name:         self.first_name,
      last_name:          self.last_name,
      gender:             self.gender.as_deref().map(decode_gender).transpose()?,
      age:                self.age.map(|a| a as u32),
      country_id:         self.country_id,
      enrollment_date:    self
        .enrollment_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      phone:              self.phone,
      email:              self.email,
      passport_number:    self.passport_number,
      visa_type:          self.visa_type,
      visa_expiry:        self.visa_expiry.as_deref().map(decode_date).transpose()?,
      course:             self.course,
      application_status: decode_status(&self.application_status)?,
      notes:              self.notes,
      consent_given:      self.consent_given,
      consent_timestamp:  self
        .consent_timestamp
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      created_by:         self.created_by,
      archived:           self.archived,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawLead::from_row`] field order.
pub const LEAD_COLS: &str = "id, source, payload, phone, email, student_id, \
  campaign_name, adset_name, ad_name, external_lead_id, processed, \
  assigned_to, created_at";

/// Raw strings read directly from a `leads` row.
pub struct RawLead {
  pub id:               i64,
  pub source:           String,
  pub payload:          String,
  pub phone:            Option<String>,
  pub email:            Option<String>,
  pub student_id:       Option<i64>,
  pub campaign_name:    String,
  pub adset_name:       String,
  pub ad_name:          String,
  pub external_lead_id: String,
  pub processed:        bool,
  pub assigned_to:      Option<i64>,
  pub created_at:       String,
}

impl RawLead {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawLead {
      id:               row.get(0)?,
      source:           row.get(1)?,
      payload:          row.get(2)?,
      phone:            row.get(3)?,
      email:            row.get(4)?,
      student_id:       row.get(5)?,
      campaign_name:    row.get(6)?,
      adset_name:       row.get(7)?,
      ad_name:          row.get(8)?,
      external_lead_id: row.get(9)?,
      processed:        row.get(10)?,
      assigned_to:      row.get(11)?,
      created_at:       row.get(12)?,
    })
  }

  pub fn into_lead(self) -> Result<Lead> {
    Ok(Lead {
      id:          self.id,
      source:      decode_source(&self.source)?,
      payload:     serde_json::from_str(&self.payload)?,
      phone:       self.phone,
      email:       self.email,
      student_id:  self.student_id,
      campaign:    CampaignInfo {
        external_lead_id: self.external_lead_id,
        campaign_name:    self.campaign_name,
        adset_name:       self.adset_name,
        ad_name:          self.ad_name,
      },
      processed:   self.processed,
      assigned_to: self.assigned_to,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawStaff::from_row`] field order.
pub const STAFF_COLS: &str =
  "id, username, first_name, last_name, email, role, active, created_at";

/// Raw strings read directly from a `staff` row.
pub struct RawStaff {
  pub id:         i64,
  pub username:   String,
  pub first_name: String,
  pub last_name:  String,
  pub email:      String,
  pub role:       String,
  pub active:     bool,
  pub created_at: String,
}

impl RawStaff {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawStaff {
      id:         row.get(0)?,
      username:   row.get(1)?,
      first_name: row.get(2)?,
      last_name:  row.get(3)?,
      email:      row.get(4)?,
      role:       row.get(5)?,
      active:     row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_staff(self) -> Result<StaffUser> {
    Ok(StaffUser {
      id:         self.id,
      username:   self.username,
      first_name: self.first_name,
      last_name:  self.last_name,
      email:      self.email,
      role:       decode_role(&self.role)?,
      active:     self.active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawActivity::from_row`] field order.
pub const ACTIVITY_COLS: &str =
  "id, actor_id, student_id, action, data, created_at";

/// Raw strings read directly from an `activity_log` row.
pub struct RawActivity {
  pub id:         i64,
  pub actor_id:   Option<i64>,
  pub student_id: Option<i64>,
  pub action:     String,
  pub data:       Option<String>,
  pub created_at: String,
}

impl RawActivity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawActivity {
      id:         row.get(0)?,
      actor_id:   row.get(1)?,
      student_id: row.get(2)?,
      action:     row.get(3)?,
      data:       row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_activity(self) -> Result<ActivityLog> {
    Ok(ActivityLog {
      id:         self.id,
      actor_id:   self.actor_id,
      student_id: self.student_id,
      action:     self.action,
      data:       self
        .data
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawEmailLog::from_row`] field order.
pub const EMAIL_LOG_COLS: &str = "id, student_id, lead_id, to_email, \
  from_email, subject, body, status, error_message, sent_at";

/// Raw strings read directly from an `email_log` row.
pub struct RawEmailLog {
  pub id:            i64,
  pub student_id:    Option<i64>,
  pub lead_id:       Option<i64>,
  pub to_email:      String,
  pub from_email:    String,
  pub subject:       String,
  pub body:          String,
  pub status:        String,
  pub error_message: String,
  pub sent_at:       String,
}

impl RawEmailLog {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawEmailLog {
      id:            row.get(0)?,
      student_id:    row.get(1)?,
      lead_id:       row.get(2)?,
      to_email:      row.get(3)?,
      from_email:    row.get(4)?,
      subject:       row.get(5)?,
      body:          row.get(6)?,
      status:        row.get(7)?,
      error_message: row.get(8)?,
      sent_at:       row.get(9)?,
    })
  }

  pub fn into_email_log(self) -> Result<EmailLog> {
    Ok(EmailLog {
      id:            self.id,
      student_id:    self.student_id,
      lead_id:       self.lead_id,
      to_email:      self.to_email,
      from_email:    self.from_email,
      subject:       self.subject,
      body:          self.body,
      status:        decode_email_status(&self.status)?,
      error_message: self.error_message,
      sent_at:       decode_dt(&self.sent_at)?,
    })
  }
}
