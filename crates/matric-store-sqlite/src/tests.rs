//! Integration tests for `SqliteStore` against an in-memory database.

use matric_core::{
  activity::NewActivity,
  document::NewDocument,
  email::{Audience, EmailStatus, NewEmailLog},
  lead::{CampaignInfo, LeadDraft, LeadSource, LEAD_SOURCE_TAG},
  staff::{NewStaff, StaffRole},
  store::{CrmStore, StaffQuery, StudentQuery, STUDENTS_PAGE_SIZE},
  student::{ApplicationStatus, NewStudent, StatusPolicy},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_student(first: &str, last: &str) -> NewStudent {
  NewStudent {
    first_name: first.to_owned(),
    last_name: last.to_owned(),
    phone: format!("+977-{first}"),
    email: format!("{first}@example.com").to_lowercase(),
    ..Default::default()
  }
}

fn draft(phone: &str, email: &str) -> LeadDraft {
  LeadDraft {
    source:      LeadSource::Facebook,
    phone:       (!phone.is_empty()).then(|| phone.to_owned()),
    email:       (!email.is_empty()).then(|| email.to_owned()),
    first_name:  "Jane".to_owned(),
    last_name:   "Doe".to_owned(),
    course:      Some("IELTS Preparation".to_owned()),
    country:     Some("Nepal".to_owned()),
    campaign:    CampaignInfo::default(),
    payload:     serde_json::json!({ "phone": phone, "email": email }),
    assigned_to: None,
  }
}

// ─── Students ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_student() {
  let s = store().await;

  let created = s.create_student(new_student("Alice", "Sharma")).await.unwrap();
  assert_eq!(created.application_status, ApplicationStatus::Pending);
  assert!(!created.consent_given);
  assert!(created.consent_timestamp.is_none());
  assert!(!created.archived);

  let fetched = s.get_student(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.first_name, "Alice");
  assert_eq!(fetched.last_name, "Sharma");
  assert_eq!(fetched.email, "alice@example.com");
  assert_eq!(fetched.created_at, created.created_at);
}

#[tokio::test]
async fn get_student_missing_returns_none() {
  let s = store().await;
  assert!(s.get_student(42).await.unwrap().is_none());
}

#[tokio::test]
async fn consent_timestamp_set_at_creation() {
  let s = store().await;

  let input = NewStudent { consent_given: true, ..new_student("Bob", "Thapa") };
  let created = s.create_student(input).await.unwrap();
  assert!(created.consent_given);
  assert!(created.consent_timestamp.is_some());
}

#[tokio::test]
async fn consent_timestamp_written_once_only() {
  let s = store().await;

  let created = s.create_student(new_student("Cara", "Rai")).await.unwrap();
  assert!(created.consent_timestamp.is_none());

  // First save with consent stamps it.
  let input = NewStudent { consent_given: true, ..new_student("Cara", "Rai") };
  let first = s.update_student(created.id, input.clone()).await.unwrap();
  let stamp = first.consent_timestamp.expect("stamped on first consent");

  // A later save with consent still true leaves the stamp alone.
  let second = s.update_student(created.id, input).await.unwrap();
  assert_eq!(second.consent_timestamp, Some(stamp));

  // Withdrawing consent clears the flag but keeps the stamp.
  let withdrawn = s
    .update_student(created.id, new_student("Cara", "Rai"))
    .await
    .unwrap();
  assert!(!withdrawn.consent_given);
  assert_eq!(withdrawn.consent_timestamp, Some(stamp));
}

#[tokio::test]
async fn update_missing_student_errors() {
  let s = store().await;
  let err = s.update_student(9, new_student("X", "Y")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound("student", 9)));
}

#[tokio::test]
async fn status_update_unrestricted() {
  let s = store().await;
  let created = s.create_student(new_student("Dev", "KC")).await.unwrap();

  s.set_application_status(
    created.id,
    ApplicationStatus::Approved,
    StatusPolicy::Unrestricted,
  )
  .await
  .unwrap();
  // Unrestricted allows moving straight back.
  s.set_application_status(
    created.id,
    ApplicationStatus::Pending,
    StatusPolicy::Unrestricted,
  )
  .await
  .unwrap();

  let fetched = s.get_student(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.application_status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn status_update_pipeline_rejects_skips() {
  let s = store().await;
  let created = s.create_student(new_student("Esha", "Lama")).await.unwrap();

  let err = s
    .set_application_status(
      created.id,
      ApplicationStatus::Approved,
      StatusPolicy::Pipeline,
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::StatusNotAllowed {
      from: ApplicationStatus::Pending,
      to:   ApplicationStatus::Approved,
    }
  ));

  // The record is untouched.
  let fetched = s.get_student(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.application_status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn archive_hides_from_default_search() {
  let s = store().await;
  let a = s.create_student(new_student("Faye", "Gurung")).await.unwrap();
  s.create_student(new_student("Gita", "Magar")).await.unwrap();

  s.archive_student(a.id).await.unwrap();

  let default_view = s.search_students(&StudentQuery::default()).await.unwrap();
  assert_eq!(default_view.total, 1);
  assert_eq!(default_view.items[0].first_name, "Gita");

  let archived_view = s
    .search_students(&StudentQuery { archived: Some(true), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(archived_view.total, 1);
  assert_eq!(archived_view.items[0].first_name, "Faye");

  // Archival is soft: the record itself is still there.
  assert!(s.get_student(a.id).await.unwrap().unwrap().archived);
}

#[tokio::test]
async fn search_text_filter() {
  let s = store().await;
  s.create_student(new_student("Hari", "Basnet")).await.unwrap();
  s.create_student(new_student("Ira", "Shrestha")).await.unwrap();

  let query = StudentQuery { text: Some("shrestha".into()), ..Default::default() };
  let page = s.search_students(&query).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].first_name, "Ira");

  // Phone is part of the text search too.
  let query = StudentQuery { text: Some("+977-Hari".into()), ..Default::default() };
  assert_eq!(s.search_students(&query).await.unwrap().total, 1);
}

#[tokio::test]
async fn search_pagination_clamps() {
  let s = store().await;
  for i in 0..15 {
    s.create_student(new_student(&format!("Student{i}"), "Test"))
      .await
      .unwrap();
  }

  let page1 = s
    .search_students(&StudentQuery { page: 1, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page1.items.len(), STUDENTS_PAGE_SIZE);
  assert_eq!(page1.total, 15);
  assert_eq!(page1.total_pages, 2);

  // Out-of-range requests clamp to the last page.
  let beyond = s
    .search_students(&StudentQuery { page: 99, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(beyond.page, 2);
  assert_eq!(beyond.items.len(), 3);
}

#[tokio::test]
async fn phone_lookup_returns_oldest_match() {
  let s = store().await;
  let first = s
    .create_student(NewStudent { phone: "123".into(), ..new_student("Old", "A") })
    .await
    .unwrap();
  s.create_student(NewStudent { phone: "123".into(), ..new_student("New", "B") })
    .await
    .unwrap();

  let found = s.find_student_by_phone("123").await.unwrap().unwrap();
  assert_eq!(found.id, first.id);

  assert!(s.find_student_by_phone("999").await.unwrap().is_none());
}

// ─── Reference data ──────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_country_is_idempotent() {
  let s = store().await;
  let a = s.ensure_country("Nepal").await.unwrap();
  let b = s.ensure_country("Nepal").await.unwrap();
  assert_eq!(a.id, b.id);
  assert_eq!(s.list_countries().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_country_nulls_student_reference() {
  let s = store().await;
  let country = s.ensure_country("India").await.unwrap();
  let student = s
    .create_student(NewStudent {
      country_id: Some(country.id),
      ..new_student("Jiya", "Patel")
    })
    .await
    .unwrap();

  s.delete_country(country.id).await.unwrap();

  let fetched = s.get_student(student.id).await.unwrap().unwrap();
  assert!(fetched.country_id.is_none());
}

#[tokio::test]
async fn tagging_is_idempotent_and_deletes_cleanly() {
  let s = store().await;
  let student = s.create_student(new_student("Kiran", "Joshi")).await.unwrap();
  let tag = s.ensure_tag("Priority").await.unwrap();

  s.tag_student(student.id, tag.id).await.unwrap();
  s.tag_student(student.id, tag.id).await.unwrap();
  assert_eq!(s.student_tags(student.id).await.unwrap().len(), 1);

  s.delete_tag(tag.id).await.unwrap();
  assert!(s.student_tags(student.id).await.unwrap().is_empty());
  // The student survives tag deletion.
  assert!(s.get_student(student.id).await.unwrap().is_some());
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_gets_dated_path() {
  let s = store().await;
  let student = s.create_student(new_student("Lena", "Tamang")).await.unwrap();

  let doc = s
    .add_document(NewDocument {
      student_id: student.id,
      title:      "Transcript".into(),
      file_name:  "transcript.pdf".into(),
      note:       "final year".into(),
    })
    .await
    .unwrap();

  assert!(doc.file_path.starts_with("student_documents/"));
  assert!(doc.file_path.ends_with("/transcript.pdf"));

  let docs = s.list_documents(student.id).await.unwrap();
  assert_eq!(docs.len(), 1);
  assert_eq!(docs[0].title, "Transcript");
}

#[tokio::test]
async fn deleting_student_cascades_documents_and_activity() {
  let s = store().await;
  let student = s.create_student(new_student("Mira", "Karki")).await.unwrap();
  s.add_document(NewDocument {
    student_id: student.id,
    title:      "Passport".into(),
    file_name:  "passport.jpg".into(),
    note:       String::new(),
  })
  .await
  .unwrap();
  s.log_activity(NewActivity {
    actor_id:   None,
    student_id: Some(student.id),
    action:     "created".into(),
    data:       None,
  })
  .await
  .unwrap();

  s.delete_student(student.id).await.unwrap();

  assert!(s.list_documents(student.id).await.unwrap().is_empty());
  assert!(s.student_activity(student.id, 10).await.unwrap().is_empty());
}

// ─── Lead intake ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn intake_creates_student_with_tag_and_activity() {
  let s = store().await;

  let outcome = s.ingest_lead(draft("0551234", "jane@example.com")).await.unwrap();
  assert!(outcome.new_student);

  let student = s.get_student(outcome.student_id).await.unwrap().unwrap();
  assert_eq!(student.first_name, "Jane");
  assert_eq!(student.last_name, "Doe");
  assert_eq!(student.phone, "0551234");
  assert_eq!(student.course.as_deref(), Some("IELTS Preparation"));
  assert!(student.country_id.is_some());

  let tags = s.student_tags(outcome.student_id).await.unwrap();
  assert!(tags.iter().any(|t| t.name == LEAD_SOURCE_TAG));

  let activity = s.student_activity(outcome.student_id, 10).await.unwrap();
  assert_eq!(activity.len(), 1);
  assert_eq!(activity[0].action, "lead_created");
  assert!(activity[0].actor_id.is_none());

  let lead = s.get_lead(outcome.lead_id).await.unwrap().unwrap();
  assert_eq!(lead.student_id, Some(outcome.student_id));
  assert_eq!(lead.source, LeadSource::Facebook);
  assert!(!lead.processed);
}

#[tokio::test]
async fn intake_matches_existing_by_phone() {
  let s = store().await;
  let existing = s
    .create_student(NewStudent { phone: "0551234".into(), ..new_student("Nora", "Ale") })
    .await
    .unwrap();

  // Different email, same phone: phone wins.
  let outcome = s.ingest_lead(draft("0551234", "other@example.com")).await.unwrap();
  assert!(!outcome.new_student);
  assert_eq!(outcome.student_id, existing.id);

  // No placeholder student was created.
  let page = s.search_students(&StudentQuery::default()).await.unwrap();
  assert_eq!(page.total, 1);
}

#[tokio::test]
async fn intake_falls_back_to_email_match() {
  let s = store().await;
  let existing = s
    .create_student(NewStudent {
      email: "jane@example.com".into(),
      ..new_student("Omi", "Bista")
    })
    .await
    .unwrap();

  let outcome = s.ingest_lead(draft("777888", "jane@example.com")).await.unwrap();
  assert!(!outcome.new_student);
  assert_eq!(outcome.student_id, existing.id);
}

#[tokio::test]
async fn duplicate_intake_yields_two_leads_one_student() {
  let s = store().await;

  let first = s.ingest_lead(draft("0551234", "jane@example.com")).await.unwrap();
  let second = s.ingest_lead(draft("0551234", "jane@example.com")).await.unwrap();

  assert!(first.new_student);
  assert!(!second.new_student);
  assert_eq!(first.student_id, second.student_id);
  assert_ne!(first.lead_id, second.lead_id);

  assert_eq!(s.list_leads(1).await.unwrap().total, 2);
  assert_eq!(s.search_students(&StudentQuery::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn intake_uses_placeholder_names() {
  let s = store().await;
  let d = LeadDraft {
    first_name: String::new(),
    last_name: String::new(),
    ..draft("0009999", "")
  };

  let outcome = s.ingest_lead(d).await.unwrap();
  let student = s.get_student(outcome.student_id).await.unwrap().unwrap();
  assert_eq!(student.first_name, "Facebook");
  assert_eq!(student.last_name, "Lead");
}

#[tokio::test]
async fn mark_lead_processed_flips_flag() {
  let s = store().await;
  let outcome = s.ingest_lead(draft("123", "a@b.c")).await.unwrap();

  s.mark_lead_processed(outcome.lead_id).await.unwrap();
  assert!(s.get_lead(outcome.lead_id).await.unwrap().unwrap().processed);

  let err = s.mark_lead_processed(999).await.unwrap_err();
  assert!(matches!(err, Error::NotFound("lead", 999)));
}

// ─── Staff ───────────────────────────────────────────────────────────────────

fn staff(username: &str, role: StaffRole, active: bool) -> NewStaff {
  NewStaff {
    username: username.to_owned(),
    first_name: String::new(),
    last_name: String::new(),
    email: format!("{username}@crm.test"),
    role,
    active,
  }
}

#[tokio::test]
async fn active_counselors_filters_role_and_activity() {
  let s = store().await;
  let admin = s.add_staff(staff("admin1", StaffRole::Admin, true)).await.unwrap();
  let manager = s.add_staff(staff("mgr1", StaffRole::Manager, true)).await.unwrap();
  s.add_staff(staff("plain", StaffRole::Staff, true)).await.unwrap();
  s.add_staff(staff("gone", StaffRole::Admin, false)).await.unwrap();

  let counselors = s.active_counselors().await.unwrap();
  let ids: Vec<i64> = counselors.iter().map(|c| c.id).collect();
  assert_eq!(ids, vec![admin.id, manager.id]);
}

#[tokio::test]
async fn list_staff_with_filters() {
  let s = store().await;
  s.add_staff(staff("admin1", StaffRole::Admin, true)).await.unwrap();
  s.add_staff(staff("mgr1", StaffRole::Manager, true)).await.unwrap();
  s.add_staff(staff("mgr2", StaffRole::Manager, false)).await.unwrap();

  let all = s.list_staff(&StaffQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let managers = s
    .list_staff(&StaffQuery { role: Some(StaffRole::Manager), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(managers.len(), 2);

  let active_managers = s
    .list_staff(&StaffQuery {
      role:   Some(StaffRole::Manager),
      active: Some(true),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(active_managers.len(), 1);
  assert_eq!(active_managers[0].username, "mgr1");

  let by_text = s
    .list_staff(&StaffQuery { text: Some("admin".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);
}

#[tokio::test]
async fn deleting_staff_nulls_references() {
  let s = store().await;
  let counselor = s.add_staff(staff("c1", StaffRole::Manager, true)).await.unwrap();

  let student = s
    .create_student(NewStudent {
      created_by: Some(counselor.id),
      ..new_student("Pia", "Limbu")
    })
    .await
    .unwrap();
  let outcome = s
    .ingest_lead(LeadDraft { assigned_to: Some(counselor.id), ..draft("5150", "") })
    .await
    .unwrap();

  s.delete_staff(counselor.id).await.unwrap();

  assert!(s.get_student(student.id).await.unwrap().unwrap().created_by.is_none());
  assert!(s.get_lead(outcome.lead_id).await.unwrap().unwrap().assigned_to.is_none());
}

// ─── Email log & audiences ───────────────────────────────────────────────────

#[tokio::test]
async fn email_log_append_and_recent() {
  let s = store().await;

  for i in 0..3 {
    s.append_email_log(NewEmailLog {
      student_id:    None,
      lead_id:       None,
      to_email:      format!("r{i}@example.com"),
      from_email:    "crm@example.com".into(),
      subject:       format!("Message {i}"),
      body:          "hello".into(),
      status:        EmailStatus::Sent,
      error_message: String::new(),
    })
    .await
    .unwrap();
  }

  let recent = s.recent_email_logs(2).await.unwrap();
  assert_eq!(recent.len(), 2);
  // Newest first.
  assert_eq!(recent[0].subject, "Message 2");
}

#[tokio::test]
async fn broadcast_audience_selection() {
  let s = store().await;
  let nepal = s.ensure_country("Nepal").await.unwrap();

  let a = s
    .create_student(NewStudent {
      course: Some("IELTS Preparation".into()),
      country_id: Some(nepal.id),
      ..new_student("Rita", "Thami")
    })
    .await
    .unwrap();
  let b = s
    .create_student(NewStudent {
      course: Some("Nursing".into()),
      ..new_student("Sam", "Khadka")
    })
    .await
    .unwrap();
  // No email: excluded from every audience.
  s.create_student(NewStudent { email: String::new(), ..new_student("Tara", "Rana") })
    .await
    .unwrap();
  // Archived: excluded too.
  let archived = s.create_student(new_student("Uma", "Chhetri")).await.unwrap();
  s.archive_student(archived.id).await.unwrap();

  let all = s.broadcast_audience(&Audience::All).await.unwrap();
  assert_eq!(all.len(), 2);

  let ielts = s
    .broadcast_audience(&Audience::Course { course: "ielts".into() })
    .await
    .unwrap();
  assert_eq!(ielts.len(), 1);
  assert_eq!(ielts[0].id, a.id);

  let in_nepal = s
    .broadcast_audience(&Audience::Country { country_id: nepal.id })
    .await
    .unwrap();
  assert_eq!(in_nepal.len(), 1);

  s.set_application_status(b.id, ApplicationStatus::Approved, StatusPolicy::Unrestricted)
    .await
    .unwrap();
  let approved = s
    .broadcast_audience(&Audience::Status { status: ApplicationStatus::Approved })
    .await
    .unwrap();
  assert_eq!(approved.len(), 1);
  assert_eq!(approved[0].id, b.id);
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_stats_shape() {
  let s = store().await;
  let nepal = s.ensure_country("Nepal").await.unwrap();
  s.create_student(NewStudent {
    country_id: Some(nepal.id),
    ..new_student("Vera", "Maharjan")
  })
  .await
  .unwrap();
  s.create_student(new_student("Wes", "Pun")).await.unwrap();
  s.ingest_lead(draft("42", "lead@example.com")).await.unwrap();

  let stats = s.dashboard_stats().await.unwrap();
  assert_eq!(stats.total_students, 3); // two created + one from intake
  assert_eq!(stats.total_leads, 1);
  assert_eq!(stats.recent_students, 3);
  assert_eq!(stats.countries.len(), stats.country_counts.len());
  assert!(stats.countries.contains(&"Nepal".to_owned()));
  assert!(stats.countries.contains(&"Unknown".to_owned()));
  assert_eq!(stats.lead_labels, vec!["facebook".to_owned()]);
  assert_eq!(stats.lead_counts, vec![1]);
}

#[tokio::test]
async fn application_stats_counts_by_status() {
  let s = store().await;
  let a = s.create_student(new_student("Xena", "Ghale")).await.unwrap();
  s.create_student(new_student("Yuri", "Bhandari")).await.unwrap();
  s.set_application_status(a.id, ApplicationStatus::Approved, StatusPolicy::Unrestricted)
    .await
    .unwrap();

  let stats = s.application_stats().await.unwrap();
  assert_eq!(stats.total_apps, 2);
  assert_eq!(stats.pending_count, 1);
  assert_eq!(stats.approved_count, 1);
  assert_eq!(stats.under_review_count, 0);
  assert_eq!(stats.rejected_count, 0);
}
