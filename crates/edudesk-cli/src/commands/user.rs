//! Account management commands for CLI.

use clap::Subcommand;
use edudesk_core::{save_user, Role, UserDraft};
use serde_json::json;

use super::{print_json, with_store, CmdResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// List accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an account
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// admin or staff (default: staff)
        #[arg(long, default_value = "staff")]
        role: Role,
        /// Department (staff only; defaults to the first department)
        #[arg(long)]
        dept: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Edit an account; omitted fields keep their value
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// New password (omit to keep the current one)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        dept: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Delete an account
    Remove { id: String },
    /// Check a login
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

pub fn run(action: UserAction) -> CmdResult {
    match action {
        UserAction::List { json } => with_store(|store| {
            if json {
                // Passwords never leave the store through the CLI.
                let users: Vec<_> = store
                    .users()
                    .iter()
                    .map(|u| {
                        json!({
                            "id": u.id,
                            "name": u.name,
                            "email": u.email,
                            "role": u.role,
                            "department": u.department,
                            "phone": u.phone,
                        })
                    })
                    .collect();
                return print_json(&users);
            }
            for u in store.users() {
                println!(
                    "{}  {:<20} {:<28} {:<6} {}",
                    u.id,
                    u.name,
                    u.email,
                    u.role,
                    u.department.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }),
        UserAction::Add {
            name,
            email,
            password,
            role,
            dept,
            phone,
        } => with_store(|store| {
            if store.find_user_by_email(&email).is_some() {
                return Err(format!("a user with email {email} already exists").into());
            }
            let user = save_user(
                store,
                UserDraft {
                    id: None,
                    name,
                    email,
                    password: Some(password),
                    role: Some(role),
                    department: dept,
                    phone,
                },
            )?;
            println!("User created: {}", user.id);
            Ok(())
        }),
        UserAction::Edit {
            id,
            name,
            email,
            password,
            role,
            dept,
            phone,
        } => with_store(|store| {
            let existing = store
                .find_user(&id)
                .cloned()
                .ok_or_else(|| format!("no user with id {id}"))?;
            let user = save_user(
                store,
                UserDraft {
                    id: Some(id),
                    name: name.unwrap_or(existing.name),
                    email: email.unwrap_or(existing.email),
                    password,
                    role: Some(role.unwrap_or(existing.role)),
                    department: dept.or(existing.department),
                    phone,
                },
            )?;
            println!("User updated: {}", user.id);
            Ok(())
        }),
        UserAction::Remove { id } => with_store(|store| {
            if !store.remove_user(&id) {
                return Err(format!("no user with id {id}").into());
            }
            println!("User removed: {id}");
            Ok(())
        }),
        UserAction::Login { email, password } => with_store(|store| {
            let mut session = edudesk_core::Session::new();
            match session.login(store, &email, &password) {
                Some(user) => {
                    println!("Signed in as {} ({})", user.name, user.role);
                    Ok(())
                }
                None => Err("invalid email or password".into()),
            }
        }),
    }
}
