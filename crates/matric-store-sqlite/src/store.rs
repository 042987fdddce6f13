//! [`SqliteStore`] — the SQLite implementation of [`CrmStore`].

use std::path::Path;

use chrono::{Datelike, Duration, Utc};
use rusqlite::OptionalExtension as _;

use matric_core::{
  activity::{ActivityLog, NewActivity},
  directory::{Country, Tag},
  document::{NewDocument, StudentDocument},
  email::{Audience, EmailLog, NewEmailLog},
  lead::{
    IntakeOutcome, Lead, LeadDraft, LEAD_SOURCE_TAG, PLACEHOLDER_FIRST_NAME,
    PLACEHOLDER_LAST_NAME,
  },
  staff::{NewStaff, StaffUser},
  store::{
    ApplicationStats, CrmStore, DashboardStats, Page, StaffQuery, StudentQuery,
    LEADS_PAGE_SIZE, STUDENTS_PAGE_SIZE,
  },
  student::{ApplicationStatus, NewStudent, StatusPolicy, Student},
};

use crate::{
  encode::{
    encode_date, encode_dt, encode_email_status, encode_gender, encode_role,
    encode_source, encode_status, RawActivity, RawEmailLog, RawLead, RawStaff,
    RawStudent, ACTIVITY_COLS, EMAIL_LOG_COLS, LEAD_COLS, STAFF_COLS,
    STUDENT_COLS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Pagination ──────────────────────────────────────────────────────────────

/// Clamp a 1-based page request against the row count.
/// Returns `(page, total_pages, offset)`.
fn paginate(total: usize, page_size: usize, requested: usize) -> (usize, usize, i64) {
  let total_pages = total.div_ceil(page_size).max(1);
  let page = requested.clamp(1, total_pages);
  (page, total_pages, ((page - 1) * page_size) as i64)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Matric CRM store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CrmStore impl ───────────────────────────────────────────────────────────

impl CrmStore for SqliteStore {
  type Error = Error;

  // ── Students ──────────────────────────────────────────────────────────────

  async fn create_student(&self, input: NewStudent) -> Result<Student> {
    let now = Utc::now();
    let consent_timestamp = input.consent_given.then_some(now);

    let gender_str = input.gender.map(encode_gender).map(str::to_owned);
    let enrollment_str = input.enrollment_date.map(encode_date);
    let visa_expiry_str = input.visa_expiry.map(encode_date);
    let status_str = encode_status(input.application_status).to_owned();
    let consent_ts_str = consent_timestamp.map(encode_dt);
    let now_str = encode_dt(now);

    let row = input.clone();
    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (
             first_name, last_name, gender, age, country_id, enrollment_date,
             phone, email, passport_number, visa_type, visa_expiry, course,
             application_status, notes, consent_given, consent_timestamp,
             created_by, archived, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, 0, ?18, ?18)",
          rusqlite::params![
            row.first_name,
            row.last_name,
            gender_str,
            row.age,
            row.country_id,
            enrollment_str,
            row.phone,
            row.email,
            row.passport_number,
            row.visa_type,
            visa_expiry_str,
            row.course,
            status_str,
            row.notes,
            row.consent_given,
            consent_ts_str,
            row.created_by,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Student {
      id,
      first_name: input.first_name,
      last_name: input.last_name,
      gender: input.gender,
      age: input.age,
      country_id: input.country_id,
      enrollment_date: input.enrollment_date,
      phone: input.phone,
      email: input.email,
      passport_number: input.passport_number,
      visa_type: input.visa_type,
      visa_expiry: input.visa_expiry,
      course: input.course,
      application_status: input.application_status,
      notes: input.notes,
      consent_given: input.consent_given,
      consent_timestamp,
      created_by: input.created_by,
      archived: false,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get_student(&self, id: i64) -> Result<Option<Student>> {
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STUDENT_COLS} FROM students WHERE id = ?1"),
              rusqlite::params![id],
              |row| RawStudent::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn update_student(&self, id: i64, input: NewStudent) -> Result<Student> {
    let now_str = encode_dt(Utc::now());
    let gender_str = input.gender.map(encode_gender).map(str::to_owned);
    let enrollment_str = input.enrollment_date.map(encode_date);
    let visa_expiry_str = input.visa_expiry.map(encode_date);
    let status_str = encode_status(input.application_status).to_owned();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // consent_timestamp is written on the first true consent only; the
        // CASE leaves an existing value untouched forever after.
        let n = tx.execute(
          "UPDATE students SET
             first_name = ?2, last_name = ?3, gender = ?4, age = ?5,
             country_id = ?6, enrollment_date = ?7, phone = ?8, email = ?9,
             passport_number = ?10, visa_type = ?11, visa_expiry = ?12,
             course = ?13, application_status = ?14, notes = ?15,
             consent_given = ?16,
             consent_timestamp = CASE
               WHEN ?16 AND consent_timestamp IS NULL THEN ?17
               ELSE consent_timestamp
             END,
             updated_at = ?17
           WHERE id = ?1",
          rusqlite::params![
            id,
            input.first_name,
            input.last_name,
            gender_str,
            input.age,
            input.country_id,
            enrollment_str,
            input.phone,
            input.email,
            input.passport_number,
            input.visa_type,
            visa_expiry_str,
            input.course,
            status_str,
            input.notes,
            input.consent_given,
            now_str,
          ],
        )?;

        if n == 0 {
          return Ok(None);
        }

        let raw = tx.query_row(
          &format!("SELECT {STUDENT_COLS} FROM students WHERE id = ?1"),
          rusqlite::params![id],
          |row| RawStudent::from_row(row),
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw
      .ok_or(Error::NotFound("student", id))?
      .into_student()
  }

  async fn set_application_status(
    &self,
    id: i64,
    status: ApplicationStatus,
    policy: StatusPolicy,
  ) -> Result<()> {
    let current = self
      .get_student(id)
      .await?
      .ok_or(Error::NotFound("student", id))?
      .application_status;

    if !policy.permits(current, status) {
      return Err(Error::StatusNotAllowed { from: current, to: status });
    }

    let status_str = encode_status(status).to_owned();
    let now_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE students SET application_status = ?2, updated_at = ?3 WHERE id = ?1",
          rusqlite::params![id, status_str, now_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn archive_student(&self, id: i64) -> Result<()> {
    let now_str = encode_dt(Utc::now());
    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE students SET archived = 1, updated_at = ?2 WHERE id = ?1",
          rusqlite::params![id, now_str],
        )?)
      })
      .await?;

    if n == 0 {
      return Err(Error::NotFound("student", id));
    }
    Ok(())
  }

  async fn delete_student(&self, id: i64) -> Result<()> {
    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM students WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if n == 0 {
      return Err(Error::NotFound("student", id));
    }
    Ok(())
  }

  async fn search_students(&self, query: &StudentQuery) -> Result<Page<Student>> {
    let text_pattern = query.text.as_deref().map(|t| format!("%{t}%"));
    let country_id = query.country_id;
    let tag_id = query.tag_id;
    let status_str = query.status.map(encode_status).map(str::to_owned);
    // Default console view hides archived records.
    let archived = query.archived.unwrap_or(false);
    let requested = query.page.max(1);

    let (raws, page, total_pages, total) = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec!["archived = ?4"];
        if text_pattern.is_some() {
          conds.push(
            "(first_name LIKE ?1 OR last_name LIKE ?1 OR course LIKE ?1 \
             OR email LIKE ?1 OR phone LIKE ?1 OR passport_number LIKE ?1)",
          );
        }
        if country_id.is_some() {
          conds.push("country_id = ?2");
        }
        if tag_id.is_some() {
          conds.push(
            "id IN (SELECT student_id FROM student_tags WHERE tag_id = ?3)",
          );
        }
        if status_str.is_some() {
          conds.push("application_status = ?5");
        }
        let where_clause = format!("WHERE {}", conds.join(" AND "));

        // The no-op LIMIT keeps the highest placeholder index at ?7 so the
        // same bind list serves both the count and the page query.
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM students {where_clause} LIMIT ?6 OFFSET ?7"),
          rusqlite::params![
            text_pattern.as_deref(),
            country_id,
            tag_id,
            archived,
            status_str.as_deref(),
            1i64,
            0i64,
          ],
          |r| r.get(0),
        )?;

        let (page, total_pages, offset) =
          paginate(total as usize, STUDENTS_PAGE_SIZE, requested);

        let sql = format!(
          "SELECT {STUDENT_COLS} FROM students {where_clause}
           ORDER BY created_at DESC, id DESC
           LIMIT ?6 OFFSET ?7"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(
            rusqlite::params![
              text_pattern.as_deref(),
              country_id,
              tag_id,
              archived,
              status_str.as_deref(),
              STUDENTS_PAGE_SIZE as i64,
              offset,
            ],
            |row| RawStudent::from_row(row),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((raws, page, total_pages, total as usize))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawStudent::into_student)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { items, page, total_pages, total })
  }

  async fn find_student_by_phone(&self, phone: &str) -> Result<Option<Student>> {
    let phone = phone.to_owned();
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {STUDENT_COLS} FROM students WHERE phone = ?1 \
                 ORDER BY id LIMIT 1"
              ),
              rusqlite::params![phone],
              |row| RawStudent::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>> {
    let email = email.to_owned();
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {STUDENT_COLS} FROM students WHERE email = ?1 \
                 ORDER BY id LIMIT 1"
              ),
              rusqlite::params![email],
              |row| RawStudent::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  // ── Reference data ────────────────────────────────────────────────────────

  async fn ensure_country(&self, name: &str) -> Result<Country> {
    let name = name.to_owned();
    let country = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO countries (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
          rusqlite::params![name],
        )?;
        let (id, name) = conn.query_row(
          "SELECT id, name FROM countries WHERE name = ?1",
          rusqlite::params![name],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(Country { id, name })
      })
      .await?;
    Ok(country)
  }

  async fn list_countries(&self) -> Result<Vec<Country>> {
    let countries = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, name FROM countries ORDER BY name")?;
        let rows = stmt
          .query_map([], |r| {
            Ok(Country { id: r.get(0)?, name: r.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(countries)
  }

  async fn delete_country(&self, id: i64) -> Result<()> {
    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM countries WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if n == 0 {
      return Err(Error::NotFound("country", id));
    }
    Ok(())
  }

  async fn ensure_tag(&self, name: &str) -> Result<Tag> {
    let name = name.to_owned();
    let tag = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
          rusqlite::params![name],
        )?;
        let (id, name) = conn.query_row(
          "SELECT id, name FROM tags WHERE name = ?1",
          rusqlite::params![name],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(Tag { id, name })
      })
      .await?;
    Ok(tag)
  }

  async fn tag_student(&self, student_id: i64, tag_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO student_tags (student_id, tag_id) VALUES (?1, ?2)",
          rusqlite::params![student_id, tag_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn student_tags(&self, student_id: i64) -> Result<Vec<Tag>> {
    let tags = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.id, t.name FROM tags t
           JOIN student_tags st ON st.tag_id = t.id
           WHERE st.student_id = ?1
           ORDER BY t.name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![student_id], |r| {
            Ok(Tag { id: r.get(0)?, name: r.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(tags)
  }

  async fn delete_tag(&self, id: i64) -> Result<()> {
    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM tags WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if n == 0 {
      return Err(Error::NotFound("tag", id));
    }
    Ok(())
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn add_document(&self, input: NewDocument) -> Result<StudentDocument> {
    let now = Utc::now();
    let file_path = format!(
      "student_documents/{:04}/{:02}/{}",
      now.year(),
      now.month(),
      input.file_name
    );
    let now_str = encode_dt(now);

    let row = input.clone();
    let path = file_path.clone();
    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO student_documents (student_id, title, file_path, note, uploaded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![row.student_id, row.title, path, row.note, now_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(StudentDocument {
      id,
      student_id: input.student_id,
      title: input.title,
      file_path,
      note: input.note,
      uploaded_at: now,
    })
  }

  async fn list_documents(&self, student_id: i64) -> Result<Vec<StudentDocument>> {
    let docs = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, student_id, title, file_path, note, uploaded_at
           FROM student_documents WHERE student_id = ?1
           ORDER BY uploaded_at DESC, id DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![student_id], |r| {
            Ok((
              r.get::<_, i64>(0)?,
              r.get::<_, i64>(1)?,
              r.get::<_, String>(2)?,
              r.get::<_, String>(3)?,
              r.get::<_, String>(4)?,
              r.get::<_, String>(5)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    docs
      .into_iter()
      .map(|(id, student_id, title, file_path, note, uploaded_at)| {
        Ok(StudentDocument {
          id,
          student_id,
          title,
          file_path,
          note,
          uploaded_at: crate::encode::decode_dt(&uploaded_at)?,
        })
      })
      .collect()
  }

  // ── Leads ─────────────────────────────────────────────────────────────────

  async fn ingest_lead(&self, draft: LeadDraft) -> Result<IntakeOutcome> {
    let now_str = encode_dt(Utc::now());
    let payload_str = serde_json::to_string(&draft.payload).map_err(Error::Json)?;
    let source_str = encode_source(draft.source).to_owned();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Resolution order: phone lookup first, email second. Exact string
        // match only; phone is treated as the more stable identifier.
        let mut student_id: Option<i64> = None;
        if let Some(phone) = draft.phone.as_deref().filter(|p| !p.is_empty()) {
          student_id = tx
            .query_row(
              "SELECT id FROM students WHERE phone = ?1 ORDER BY id LIMIT 1",
              rusqlite::params![phone],
              |r| r.get(0),
            )
            .optional()?;
        }
        if student_id.is_none() {
          if let Some(email) = draft.email.as_deref().filter(|e| !e.is_empty()) {
            student_id = tx
              .query_row(
                "SELECT id FROM students WHERE email = ?1 ORDER BY id LIMIT 1",
                rusqlite::params![email],
                |r| r.get(0),
              )
              .optional()?;
          }
        }

        let mut new_student = false;
        let student_id = match student_id {
          Some(id) => id,
          None => {
            let country_id: Option<i64> =
              match draft.country.as_deref().filter(|c| !c.is_empty()) {
                Some(name) => {
                  tx.execute(
                    "INSERT INTO countries (name) VALUES (?1) \
                     ON CONFLICT(name) DO NOTHING",
                    rusqlite::params![name],
                  )?;
                  Some(tx.query_row(
                    "SELECT id FROM countries WHERE name = ?1",
                    rusqlite::params![name],
                    |r| r.get(0),
                  )?)
                }
                None => None,
              };

            let first_name = if draft.first_name.is_empty() {
              PLACEHOLDER_FIRST_NAME
            } else {
              &draft.first_name
            };
            let last_name = if draft.last_name.is_empty() {
              PLACEHOLDER_LAST_NAME
            } else {
              &draft.last_name
            };

            tx.execute(
              "INSERT INTO students (
                 first_name, last_name, phone, email, course, country_id,
                 created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
              rusqlite::params![
                first_name,
                last_name,
                draft.phone.as_deref().unwrap_or(""),
                draft.email.as_deref().unwrap_or(""),
                draft.course,
                country_id,
                now_str,
              ],
            )?;
            let sid = tx.last_insert_rowid();

            tx.execute(
              "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
              rusqlite::params![LEAD_SOURCE_TAG],
            )?;
            let tag_id: i64 = tx.query_row(
              "SELECT id FROM tags WHERE name = ?1",
              rusqlite::params![LEAD_SOURCE_TAG],
              |r| r.get(0),
            )?;
            tx.execute(
              "INSERT OR IGNORE INTO student_tags (student_id, tag_id) VALUES (?1, ?2)",
              rusqlite::params![sid, tag_id],
            )?;

            new_student = true;
            sid
          }
        };

        tx.execute(
          "INSERT INTO leads (
             source, payload, phone, email, student_id, campaign_name,
             adset_name, ad_name, external_lead_id, assigned_to, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            source_str,
            payload_str,
            draft.phone,
            draft.email,
            student_id,
            draft.campaign.campaign_name,
            draft.campaign.adset_name,
            draft.campaign.ad_name,
            draft.campaign.external_lead_id,
            draft.assigned_to,
            now_str,
          ],
        )?;
        let lead_id = tx.last_insert_rowid();

        let data = serde_json::json!({
          "source": source_str,
          "lead_id": lead_id,
          "new_student_created": new_student,
        })
        .to_string();
        tx.execute(
          "INSERT INTO activity_log (actor_id, student_id, action, data, created_at)
           VALUES (NULL, ?1, 'lead_created', ?2, ?3)",
          rusqlite::params![student_id, data, now_str],
        )?;

        tx.commit()?;
        Ok(IntakeOutcome { lead_id, student_id, new_student })
      })
      .await?;

    Ok(outcome)
  }

  async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
    let raw: Option<RawLead> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {LEAD_COLS} FROM leads WHERE id = ?1"),
              rusqlite::params![id],
              |row| RawLead::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLead::into_lead).transpose()
  }

  async fn list_leads(&self, page: usize) -> Result<Page<Lead>> {
    let requested = page.max(1);

    let (raws, page, total_pages, total) = self
      .conn
      .call(move |conn| {
        let total: i64 =
          conn.query_row("SELECT COUNT(*) FROM leads", [], |r| r.get(0))?;
        let (page, total_pages, offset) =
          paginate(total as usize, LEADS_PAGE_SIZE, requested);

        let mut stmt = conn.prepare(&format!(
          "SELECT {LEAD_COLS} FROM leads
           ORDER BY created_at DESC, id DESC
           LIMIT ?1 OFFSET ?2"
        ))?;
        let raws = stmt
          .query_map(
            rusqlite::params![LEADS_PAGE_SIZE as i64, offset],
            |row| RawLead::from_row(row),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((raws, page, total_pages, total as usize))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawLead::into_lead)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { items, page, total_pages, total })
  }

  async fn mark_lead_processed(&self, id: i64) -> Result<()> {
    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE leads SET processed = 1 WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;

    if n == 0 {
      return Err(Error::NotFound("lead", id));
    }
    Ok(())
  }

  // ── Staff ─────────────────────────────────────────────────────────────────

  async fn add_staff(&self, input: NewStaff) -> Result<StaffUser> {
    let now = Utc::now();
    let now_str = encode_dt(now);
    let role_str = encode_role(input.role).to_owned();

    let row = input.clone();
    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO staff (username, first_name, last_name, email, role, active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.username,
            row.first_name,
            row.last_name,
            row.email,
            role_str,
            row.active,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(StaffUser {
      id,
      username: input.username,
      first_name: input.first_name,
      last_name: input.last_name,
      email: input.email,
      role: input.role,
      active: input.active,
      created_at: now,
    })
  }

  async fn get_staff(&self, id: i64) -> Result<Option<StaffUser>> {
    let raw: Option<RawStaff> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STAFF_COLS} FROM staff WHERE id = ?1"),
              rusqlite::params![id],
              |row| RawStaff::from_row(row),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStaff::into_staff).transpose()
  }

  async fn list_staff(&self, query: &StaffQuery) -> Result<Vec<StaffUser>> {
    let text_pattern = query.text.as_deref().map(|t| format!("%{t}%"));
    let role_str = query.role.map(encode_role).map(str::to_owned);
    let active = query.active;

    let raws = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if text_pattern.is_some() {
          conds.push(
            "(username LIKE ?1 OR first_name LIKE ?1 OR last_name LIKE ?1 \
             OR email LIKE ?1)",
          );
        }
        if role_str.is_some() {
          conds.push("role = ?2");
        }
        if active.is_some() {
          conds.push("active = ?3");
        }
        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        // LIMIT -1 is unbounded; it keeps the parameter count fixed so the
        // same bind list works for every filter combination.
        let sql = format!(
          "SELECT {STAFF_COLS} FROM staff {where_clause} ORDER BY id LIMIT ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(
            rusqlite::params![
              text_pattern.as_deref(),
              role_str.as_deref(),
              active,
              -1i64,
            ],
            |row| RawStaff::from_row(row),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawStaff::into_staff).collect()
  }

  async fn active_counselors(&self) -> Result<Vec<StaffUser>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STAFF_COLS} FROM staff
           WHERE active = 1 AND role IN ('admin', 'manager')
           ORDER BY id"
        ))?;
        let raws = stmt
          .query_map([], |row| RawStaff::from_row(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawStaff::into_staff).collect()
  }

  async fn delete_staff(&self, id: i64) -> Result<()> {
    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM staff WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if n == 0 {
      return Err(Error::NotFound("staff user", id));
    }
    Ok(())
  }

  // ── Activity log ──────────────────────────────────────────────────────────

  async fn log_activity(&self, input: NewActivity) -> Result<ActivityLog> {
    let now = Utc::now();
    let now_str = encode_dt(now);
    let data_str = input
      .data
      .as_ref()
      .map(serde_json::to_string)
      .transpose()
      .map_err(Error::Json)?;

    let row = input.clone();
    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity_log (actor_id, student_id, action, data, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![row.actor_id, row.student_id, row.action, data_str, now_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(ActivityLog {
      id,
      actor_id: input.actor_id,
      student_id: input.student_id,
      action: input.action,
      data: input.data,
      created_at: now,
    })
  }

  async fn student_activity(
    &self,
    student_id: i64,
    limit: usize,
  ) -> Result<Vec<ActivityLog>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACTIVITY_COLS} FROM activity_log
           WHERE student_id = ?1
           ORDER BY created_at DESC, id DESC
           LIMIT ?2"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![student_id, limit as i64], |row| {
            RawActivity::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  // ── Email log ─────────────────────────────────────────────────────────────

  async fn append_email_log(&self, input: NewEmailLog) -> Result<EmailLog> {
    let now = Utc::now();
    let now_str = encode_dt(now);
    let status_str = encode_email_status(input.status).to_owned();

    let row = input.clone();
    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO email_log (
             student_id, lead_id, to_email, from_email, subject, body,
             status, error_message, sent_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            row.student_id,
            row.lead_id,
            row.to_email,
            row.from_email,
            row.subject,
            row.body,
            status_str,
            row.error_message,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(EmailLog {
      id,
      student_id: input.student_id,
      lead_id: input.lead_id,
      to_email: input.to_email,
      from_email: input.from_email,
      subject: input.subject,
      body: input.body,
      status: input.status,
      error_message: input.error_message,
      sent_at: now,
    })
  }

  async fn recent_email_logs(&self, limit: usize) -> Result<Vec<EmailLog>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EMAIL_LOG_COLS} FROM email_log
           ORDER BY sent_at DESC, id DESC
           LIMIT ?1"
        ))?;
        let raws = stmt
          .query_map(rusqlite::params![limit as i64], |row| {
            RawEmailLog::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawEmailLog::into_email_log).collect()
  }

  async fn broadcast_audience(&self, audience: &Audience) -> Result<Vec<Student>> {
    let audience = audience.clone();

    let raws = self
      .conn
      .call(move |conn| {
        let base = format!(
          "SELECT {STUDENT_COLS} FROM students WHERE archived = 0 AND email != ''"
        );
        let raws = match &audience {
          Audience::All => {
            let mut stmt = conn.prepare(&format!("{base} ORDER BY id"))?;
            stmt
              .query_map([], |row| RawStudent::from_row(row))?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
          Audience::Course { course } => {
            let pattern = format!("%{course}%");
            let mut stmt =
              conn.prepare(&format!("{base} AND course LIKE ?1 ORDER BY id"))?;
            stmt
              .query_map(rusqlite::params![pattern], |row| {
                RawStudent::from_row(row)
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
          Audience::Country { country_id } => {
            let mut stmt =
              conn.prepare(&format!("{base} AND country_id = ?1 ORDER BY id"))?;
            stmt
              .query_map(rusqlite::params![country_id], |row| {
                RawStudent::from_row(row)
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
          Audience::Status { status } => {
            let status_str = encode_status(*status);
            let mut stmt = conn.prepare(&format!(
              "{base} AND application_status = ?1 ORDER BY id"
            ))?;
            stmt
              .query_map(rusqlite::params![status_str], |row| {
                RawStudent::from_row(row)
              })?
              .collect::<rusqlite::Result<Vec<_>>>()?
          }
        };
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn dashboard_stats(&self) -> Result<DashboardStats> {
    let cutoff_str = encode_dt(Utc::now() - Duration::days(30));

    let stats = self
      .conn
      .call(move |conn| {
        let mut country_stmt = conn.prepare(
          "SELECT COALESCE(c.name, 'Unknown'), COUNT(s.id)
           FROM students s LEFT JOIN countries c ON c.id = s.country_id
           GROUP BY c.name ORDER BY COUNT(s.id) DESC",
        )?;
        let country_rows = country_stmt
          .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut lead_stmt =
          conn.prepare("SELECT source, COUNT(*) FROM leads GROUP BY source")?;
        let lead_rows = lead_stmt
          .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let recent: i64 = conn.query_row(
          "SELECT COUNT(*) FROM students WHERE created_at >= ?1",
          rusqlite::params![cutoff_str],
          |r| r.get(0),
        )?;
        let total_students: i64 =
          conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
        let total_leads: i64 =
          conn.query_row("SELECT COUNT(*) FROM leads", [], |r| r.get(0))?;

        let (countries, country_counts) = country_rows
          .into_iter()
          .map(|(n, c)| (n, c as usize))
          .unzip();
        let (lead_labels, lead_counts) =
          lead_rows.into_iter().map(|(n, c)| (n, c as usize)).unzip();

        Ok(DashboardStats {
          countries,
          country_counts,
          lead_labels,
          lead_counts,
          recent_students: recent as usize,
          total_students: total_students as usize,
          total_leads: total_leads as usize,
        })
      })
      .await?;

    Ok(stats)
  }

  async fn application_stats(&self) -> Result<ApplicationStats> {
    let stats = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT application_status, COUNT(*) FROM students GROUP BY application_status",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = ApplicationStats {
          total_apps:         0,
          pending_count:      0,
          under_review_count: 0,
          approved_count:     0,
          rejected_count:     0,
        };
        for (status, count) in rows {
          let count = count as usize;
          stats.total_apps += count;
          match status.as_str() {
            "pending" => stats.pending_count += count,
            "under_review" => stats.under_review_count += count,
            "approved" => stats.approved_count += count,
            "rejected" => stats.rejected_count += count,
            _ => {}
          }
        }
        Ok(stats)
      })
      .await?;

    Ok(stats)
  }
}
