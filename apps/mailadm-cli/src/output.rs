//! Table and detail rendering for command output

use mailadm_ldap::{AccountSettings, DomainSummary, MailUser, SettingValue};

/// Truncate a string for table display, handling Unicode safely.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

pub fn print_domain_table(domains: &[DomainSummary]) {
    println!("{:<40} {:<8} {:>8}", "DOMAIN", "ACTIVE", "USERS");
    println!("{}", "-".repeat(58));

    for domain in domains {
        let users = domain
            .user_count
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "{:<40} {:<8} {:>8}",
            truncate(&domain.name, 38),
            yes_no(domain.active),
            users
        );
    }
}

pub fn print_settings(domain: &str, settings: &AccountSettings) {
    println!("Settings: {domain}");
    println!("{}", "\u{2501}".repeat(50));
    if settings.is_empty() {
        println!("(none)");
        return;
    }
    for (key, value) in settings.iter() {
        let rendered = match value {
            SettingValue::Int(n) => n.to_string(),
            SettingValue::List(items) => items.join(", "),
            SettingValue::Text(text) => text.clone(),
        };
        println!("{key:<28} {rendered}");
    }
}

pub fn print_user_table(users: &[MailUser]) {
    println!(
        "{:<36} {:<24} {:>10} {:<8} {:<6}",
        "MAIL", "NAME", "QUOTA MB", "ACTIVE", "ADMIN"
    );
    println!("{}", "-".repeat(88));

    for user in users {
        println!(
            "{:<36} {:<24} {:>10} {:<8} {:<6}",
            truncate(&user.mail, 34),
            truncate(or_dash(&user.cn), 22),
            user.mail_quota,
            yes_no(user.account_status),
            yes_no(user.domain_global_admin)
        );
    }
}

pub fn print_user_details(user: &MailUser) {
    println!("User: {}", user.mail);
    println!("{}", "\u{2501}".repeat(50));
    println!("UID:              {}", user.uid);
    println!("Display Name:     {}", or_dash(&user.cn));
    println!("First Name:       {}", or_dash(&user.given_name));
    println!("Last Name:        {}", or_dash(&user.sn));
    println!("Title:            {}", or_dash(&user.title));
    println!("Employee Number:  {}", or_dash(&user.employee_number));
    println!("Telephone:        {}", or_dash(&user.telephone_number));
    println!("Mobile:           {}", or_dash(&user.mobile));
    println!("Quota:            {} MB", user.mail_quota);
    println!("Active:           {}", yes_no(user.account_status));
    println!("Global Admin:     {}", yes_no(user.domain_global_admin));
}
