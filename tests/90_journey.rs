//! End-to-end journeys against a live database. Every test bails out
//! quietly when /health reports the database as unavailable.

mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const PASSWORD: &str = "a-long-enough-password";

fn unique_email(tag: &str) -> String {
    format!("{}-{}@carely.test", tag, uuid::Uuid::new_v4().simple())
}

struct Session {
    token: String,
    refresh_token: String,
    email: String,
    caregiver: Value,
}

async fn register(client: &Client, base_url: &str, tag: &str) -> Result<Session> {
    let email = unique_email(tag);
    let res = client
        .post(format!("{}/auth/register", base_url))
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "name": format!("Caregiver {}", tag),
        }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "register failed: {}",
        res.status()
    );

    let body = res.json::<Value>().await?;
    Ok(Session {
        token: body["data"]["token"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refresh_token"].as_str().unwrap().to_string(),
        email,
        caregiver: body["data"]["caregiver"].clone(),
    })
}

async fn create_elder(client: &Client, base_url: &str, token: &str, name: &str) -> Result<String> {
    let res = client
        .post(format!("{}/api/elders", base_url))
        .bearer_auth(token)
        .json(&json!({"name": name, "city": "Oslo"}))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "elder create failed: {}",
        res.status()
    );
    let body = res.json::<Value>().await?;
    Ok(body["data"]["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn register_login_whoami_flow() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::db_ready(server).await? {
        eprintln!("skipping journey test: database unavailable");
        return Ok(());
    }
    let client = Client::new();

    let session = register(&client, &server.base_url, "alpha").await?;
    assert_eq!(session.caregiver["email"], session.email.as_str());
    // Credential material never appears in responses
    assert!(session.caregiver.get("password_hash").is_none());
    assert!(session.caregiver.get("password_salt").is_none());

    // Duplicate email is a conflict
    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({
            "email": session.email,
            "password": PASSWORD,
            "name": "Someone Else",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Login works, and case in the email address does not matter
    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({"email": session.email.to_uppercase(), "password": PASSWORD}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let login_token = body["data"]["token"].as_str().unwrap().to_string();

    // Wrong password and unknown email answer identically
    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({"email": session.email, "password": "wrong-password!"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = res.json::<Value>().await?;

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({"email": unique_email("ghost"), "password": PASSWORD}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = res.json::<Value>().await?;
    assert_eq!(wrong_password["message"], unknown_email["message"]);

    // whoami resolves the token to the profile
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&login_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["email"], session.email.as_str());

    Ok(())
}

#[tokio::test]
async fn care_team_membership_and_notes_journey() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::db_ready(server).await? {
        eprintln!("skipping journey test: database unavailable");
        return Ok(());
    }
    let client = Client::new();

    let owner = register(&client, &server.base_url, "owner").await?;
    let joiner = register(&client, &server.base_url, "joiner").await?;
    let outsider = register(&client, &server.base_url, "outsider").await?;

    let elder_id = create_elder(&client, &server.base_url, &owner.token, "Margaret Olsen").await?;

    // Owner sees the elder in their list
    let res = client
        .get(format!("{}/api/elders", server.base_url))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&elder_id.as_str()));

    // Outsider gets 403 on a real elder, anyone gets 404 on a missing one
    let res = client
        .get(format!("{}/api/elders/{}", server.base_url, elder_id))
        .bearer_auth(&outsider.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(format!(
            "{}/api/elders/{}",
            server.base_url,
            uuid::Uuid::new_v4()
        ))
        .bearer_auth(&outsider.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Invite the joiner
    let res = client
        .post(format!("{}/api/elders/{}/invites", server.base_url, elder_id))
        .bearer_auth(&owner.token)
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    let code = body["data"]["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);

    let res = client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&joiner.token)
        .json(&json!({"code": code}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["id"], elder_id.as_str());

    // Re-accepting is a conflict, not a second membership
    let res = client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&joiner.token)
        .json(&json!({"code": code}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Bogus codes are indistinguishable from expired ones
    let res = client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&outsider.token)
        .json(&json!({"code": "zzzzzzzz"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Roster now holds owner and member
    let res = client
        .get(format!(
            "{}/api/elders/{}/caregivers",
            server.base_url, elder_id
        ))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    let roster = body["data"].as_array().unwrap();
    assert_eq!(roster.len(), 2);
    let roles: Vec<&str> = roster.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert!(roles.contains(&"owner"));
    assert!(roles.contains(&"member"));

    // Joiner writes a note; only the author may edit or delete it
    let res = client
        .post(format!("{}/api/elders/{}/notes", server.base_url, elder_id))
        .bearer_auth(&joiner.token)
        .json(&json!({"header": "Medication", "content": "Remember the evening dose."}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    let note_id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/api/elders/{}/notes", server.base_url, elder_id))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    let notes = body["data"].as_array().unwrap();
    assert!(!notes.is_empty());
    assert_eq!(notes[0]["author_name"], "Caregiver joiner");

    let res = client
        .put(format!("{}/api/notes/{}", server.base_url, note_id))
        .bearer_auth(&owner.token)
        .json(&json!({"content": "Edited by someone else"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(format!("{}/api/notes/{}", server.base_url, note_id))
        .bearer_auth(&joiner.token)
        .json(&json!({"content": "Dose moved to 20:00."}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["content"], "Dose moved to 20:00.");
    assert_eq!(body["data"]["header"], "Medication");

    let res = client
        .delete(format!("{}/api/notes/{}", server.base_url, note_id))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(format!("{}/api/notes/{}", server.base_url, note_id))
        .bearer_auth(&joiner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn appointments_responses_and_dashboard() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::db_ready(server).await? {
        eprintln!("skipping journey test: database unavailable");
        return Ok(());
    }
    let client = Client::new();

    let owner = register(&client, &server.base_url, "sched-owner").await?;
    let member = register(&client, &server.base_url, "sched-member").await?;
    let elder_id = create_elder(&client, &server.base_url, &owner.token, "Arne Berg").await?;

    // Bring the second caregiver onto the team
    let res = client
        .post(format!("{}/api/elders/{}/invites", server.base_url, elder_id))
        .bearer_auth(&owner.token)
        .json(&json!({"max_uses": 1}))
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    let code = body["data"]["code"].as_str().unwrap().to_string();
    client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&member.token)
        .json(&json!({"code": code}))
        .send()
        .await?;

    let starts = chrono::Utc::now() + chrono::Duration::days(3);
    let ends = starts + chrono::Duration::hours(1);

    // A backwards window is rejected up front
    let res = client
        .post(format!(
            "{}/api/elders/{}/appointments",
            server.base_url, elder_id
        ))
        .bearer_auth(&owner.token)
        .json(&json!({"name": "Backwards", "starts_at": ends, "ends_at": starts}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert!(body["field_errors"].get("ends_at").is_some());

    let res = client
        .post(format!(
            "{}/api/elders/{}/appointments",
            server.base_url, elder_id
        ))
        .bearer_auth(&owner.token)
        .json(&json!({
            "name": "Cardiology check-up",
            "details": "Bring the referral letter.",
            "location": "St. Olav's Hospital",
            "starts_at": starts,
            "ends_at": ends,
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    let appointment_id = body["data"]["id"].as_str().unwrap().to_string();

    // Listing attaches the viewer's response; nobody has responded yet
    let res = client
        .get(format!(
            "{}/api/elders/{}/appointments",
            server.base_url, elder_id
        ))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0]["my_response"].is_null());
    assert_eq!(listed[0]["accepted_count"].as_i64(), Some(0));

    // Owner accepts, member declines; tallies line up per viewer
    let res = client
        .post(format!(
            "{}/api/appointments/{}/accept",
            server.base_url, appointment_id
        ))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["my_response"], "accepted");
    assert_eq!(body["data"]["accepted_count"].as_i64(), Some(1));

    let res = client
        .post(format!(
            "{}/api/appointments/{}/decline",
            server.base_url, appointment_id
        ))
        .bearer_auth(&member.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["my_response"], "declined");
    assert_eq!(body["data"]["accepted_count"].as_i64(), Some(1));
    assert_eq!(body["data"]["declined_count"].as_i64(), Some(1));

    // Changing your mind overwrites the previous response
    let res = client
        .post(format!(
            "{}/api/appointments/{}/accept",
            server.base_url, appointment_id
        ))
        .bearer_auth(&member.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["my_response"], "accepted");
    assert_eq!(body["data"]["accepted_count"].as_i64(), Some(2));
    assert_eq!(body["data"]["declined_count"].as_i64(), Some(0));

    // Any team member can edit the appointment
    let res = client
        .put(format!(
            "{}/api/appointments/{}",
            server.base_url, appointment_id
        ))
        .bearer_auth(&member.token)
        .json(&json!({"location": "Ward 3"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["location"], "Ward 3");

    // A from-bound in the far future filters everything out
    let res = client
        .get(format!(
            "{}/api/elders/{}/appointments?from=2099-01-01T00:00:00Z",
            server.base_url, elder_id
        ))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Dashboard pulls it all together for the owner
    let res = client
        .get(format!("{}/api/dashboard", server.base_url))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert!(body["data"]["elder_count"].as_i64().unwrap() >= 1);
    let upcoming = body["data"]["upcoming_appointments"].as_array().unwrap();
    assert!(upcoming
        .iter()
        .any(|a| a["id"].as_str() == Some(appointment_id.as_str())));
    assert!(body["data"]["recent_notes"].is_array());

    // Deletion is for any member too; the row is gone afterwards
    let res = client
        .delete(format!(
            "{}/api/appointments/{}",
            server.base_url, appointment_id
        ))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!(
            "{}/api/appointments/{}",
            server.base_url, appointment_id
        ))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn refresh_token_rotates_and_is_single_use() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::db_ready(server).await? {
        eprintln!("skipping journey test: database unavailable");
        return Ok(());
    }
    let client = Client::new();

    let session = register(&client, &server.base_url, "refresh").await?;

    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .json(&json!({"refresh_token": session.refresh_token}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    let rotated = body["data"]["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, session.refresh_token);
    assert!(body["data"]["token"].as_str().is_some());

    // The spent token is gone
    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .json(&json!({"refresh_token": session.refresh_token}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // The rotated one works
    let res = client
        .post(format!("{}/auth/refresh", server.base_url))
        .json(&json!({"refresh_token": rotated}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    Ok(())
}

const JOURNEY_CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Carely Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:journey-evt-1@carely.test\r\n\
DTSTART:20270401T090000Z\r\n\
DTEND:20270401T100000Z\r\n\
SUMMARY:Physiotherapy\r\n\
LOCATION:Clinic B\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:journey-evt-2@carely.test\r\n\
DTSTART;VALUE=DATE:20270402\r\n\
SUMMARY:Day visit\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:journey-evt-3@carely.test\r\n\
SUMMARY:No start\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[tokio::test]
async fn ics_import_deduplicates_by_uid() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::db_ready(server).await? {
        eprintln!("skipping journey test: database unavailable");
        return Ok(());
    }
    let client = Client::new();

    let session = register(&client, &server.base_url, "ics").await?;
    let elder_id = create_elder(&client, &server.base_url, &session.token, "Ingrid Dahl").await?;

    let import_url = format!(
        "{}/api/elders/{}/appointments/import",
        server.base_url, elder_id
    );

    let res = client
        .post(&import_url)
        .bearer_auth(&session.token)
        .header("content-type", "text/calendar")
        .body(JOURNEY_CALENDAR)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["imported"].as_u64(), Some(2));
    assert_eq!(body["data"]["skipped"].as_u64(), Some(1));

    // Same feed again: the UIDs are already present
    let res = client
        .post(&import_url)
        .bearer_auth(&session.token)
        .header("content-type", "text/calendar")
        .body(JOURNEY_CALENDAR)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["imported"].as_u64(), Some(0));
    assert_eq!(body["data"]["skipped"].as_u64(), Some(3));

    // Imported events surface as ordinary appointments
    let res = client
        .get(format!(
            "{}/api/elders/{}/appointments",
            server.base_url, elder_id
        ))
        .bearer_auth(&session.token)
        .send()
        .await?;
    let body = res.json::<Value>().await?;
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "Physiotherapy");
    assert_eq!(listed[0]["location"], "Clinic B");
    assert_eq!(listed[1]["name"], "Day visit");

    // Unsupported scheme is a client error
    let res = client
        .post(&import_url)
        .bearer_auth(&session.token)
        .json(&json!({"url": "ftp://calendar.example.com/feed.ics"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unreachable feed is a bad gateway
    let res = client
        .post(&import_url)
        .bearer_auth(&session.token)
        .json(&json!({"url": "http://127.0.0.1:1/feed.ics"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    // Empty non-JSON body has nothing to parse
    let res = client
        .post(&import_url)
        .bearer_auth(&session.token)
        .header("content-type", "text/calendar")
        .body("")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
