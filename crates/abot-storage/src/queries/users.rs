// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User accounts and signup.

use abot_core::{AbotError, FlexId, FlexIdKind, User};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::Database;
use crate::models::{NewUser, UserCredentials};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        admin: row.get(3)?,
        trainer: row.get(4)?,
    })
}

/// Bind `flexid` to `user_id` unless it already belongs to someone else.
///
/// Returns false when the identity is bound to another user.
fn bind_flexid(
    tx: &rusqlite::Transaction<'_>,
    user_id: i64,
    value: &str,
    kind: FlexIdKind,
) -> rusqlite::Result<bool> {
    let changed = tx.execute(
        "INSERT INTO userflexids (userid, flexid, flexidtype) VALUES (?1, ?2, ?3)
         ON CONFLICT(flexid, flexidtype) DO UPDATE SET userid = excluded.userid
         WHERE userflexids.userid IS NULL OR userflexids.userid = excluded.userid",
        params![user_id, value, kind.code()],
    )?;
    Ok(changed > 0)
}

/// Create a user and bind its email and phone flex-ids in one transaction.
///
/// A pre-existing unbound flex-id (an identity that talked to the assistant
/// before signing up) is linked to the new user.
pub async fn create_user(db: &Database, new_user: &NewUser) -> Result<User, AbotError> {
    let new_user = new_user.clone();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Result<User, String>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let taken: Option<i64> = tx
                .query_row(
                    "SELECT id FROM users WHERE email = ?1",
                    params![new_user.email],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Ok(Err("email already registered".to_string()));
            }

            tx.execute(
                "INSERT INTO users (name, email, password, admin, trainer)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new_user.name,
                    new_user.email,
                    new_user.password_hash,
                    new_user.admin,
                    new_user.trainer,
                ],
            )?;
            let id = tx.last_insert_rowid();

            if !bind_flexid(&tx, id, &new_user.email, FlexIdKind::Email)? {
                return Ok(Err("email already registered".to_string()));
            }
            if let Some(phone) = &new_user.phone
                && !bind_flexid(&tx, id, phone, FlexIdKind::Phone)?
            {
                return Ok(Err("phone number already registered".to_string()));
            }

            tx.commit()?;
            Ok(Ok(User {
                id,
                name: new_user.name,
                email: new_user.email,
                admin: new_user.admin,
                trainer: new_user.trainer,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    outcome.map_err(AbotError::BadRequest)
}

/// Get a user by id.
pub async fn get_user(db: &Database, id: i64) -> Result<Option<User>, AbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, email, admin, trainer FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user and its password hash by email, for login.
pub async fn get_credentials(
    db: &Database,
    email: &str,
) -> Result<Option<UserCredentials>, AbotError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, email, admin, trainer, password FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(UserCredentials {
                        user: user_from_row(row)?,
                        password_hash: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The user a flex-id is bound to, if any.
pub async fn get_user_by_flexid(db: &Database, flex: &FlexId) -> Result<Option<User>, AbotError> {
    let value = flex.value().to_string();
    let kind = flex.kind().code();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT u.id, u.name, u.email, u.admin, u.trainer
                 FROM users u JOIN userflexids f ON f.userid = u.id
                 WHERE f.flexid = ?1 AND f.flexidtype = ?2",
                params![value, kind],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::flexids;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn new_user(email: &str, phone: Option<&str>) -> NewUser {
        NewUser {
            name: "Ann".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            phone: phone.map(Into::into),
            admin: false,
            trainer: false,
        }
    }

    #[tokio::test]
    async fn create_binds_email_and_phone() {
        let (db, _dir) = setup().await;
        let user = create_user(&db, &new_user("ann@example.com", Some("+13105550123")))
            .await
            .unwrap();

        let by_phone = get_user_by_flexid(&db, &FlexId::Phone("+13105550123".into()))
            .await
            .unwrap();
        assert_eq!(by_phone, Some(user.clone()));

        let by_email = get_user_by_flexid(&db, &FlexId::Email("ann@example.com".into()))
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn signup_links_existing_unbound_flexid() {
        let (db, _dir) = setup().await;
        let phone = FlexId::Phone("+13105550123".into());
        flexids::ensure_flexid(&db, &phone).await.unwrap();
        assert!(get_user_by_flexid(&db, &phone).await.unwrap().is_none());

        let user = create_user(&db, &new_user("ann@example.com", Some("+13105550123")))
            .await
            .unwrap();
        assert_eq!(
            get_user_by_flexid(&db, &phone).await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_email_is_a_bad_request() {
        let (db, _dir) = setup().await;
        create_user(&db, &new_user("ann@example.com", None)).await.unwrap();
        let err = create_user(&db, &new_user("ann@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AbotError::BadRequest(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn phone_owned_by_another_user_rolls_back() {
        let (db, _dir) = setup().await;
        create_user(&db, &new_user("ann@example.com", Some("+1555")))
            .await
            .unwrap();
        let err = create_user(&db, &new_user("bob@example.com", Some("+1555")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("phone"));
        assert!(get_credentials(&db, "bob@example.com").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn credentials_include_hash() {
        let (db, _dir) = setup().await;
        let user = create_user(&db, &new_user("ann@example.com", None)).await.unwrap();
        let creds = get_credentials(&db, "ann@example.com").await.unwrap().unwrap();
        assert_eq!(creds.user, user);
        assert_eq!(creds.password_hash, "$argon2id$stub");
        assert_eq!(get_user(&db, user.id).await.unwrap(), Some(user));
        db.close().await.unwrap();
    }
}
