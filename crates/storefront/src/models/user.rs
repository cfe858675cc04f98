//! User profile document types.
//!
//! One profile document per identity, keyed by uid in the `users`
//! collection. The role is a tagged union on `userType`: company accounts
//! carry the business fields, admin accounts carry permission flags, and
//! exactly one of the two is ever present. The role is fixed at
//! registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{
    AdminPermissions, CollaborationType, Email, PreferredChannel, PreferredLanguage, UserId,
    UserType,
};

/// A user profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity uid (also the document key).
    pub uid: UserId,
    /// Denormalized from the identity at registration.
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Stamped by the store at write time; absent until stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub contact_name: String,
    #[serde(default)]
    pub contact_position: String,
    pub phone_number: String,
    pub terms_accepted: bool,
    pub gdpr_accepted: bool,
    /// Role-dependent fields, tagged by `userType`.
    #[serde(flatten)]
    pub role: RoleProfile,
}

impl UserProfile {
    /// The account type discriminant.
    #[must_use]
    pub const fn user_type(&self) -> UserType {
        match self.role {
            RoleProfile::Company(_) => UserType::Company,
            RoleProfile::Admin(_) => UserType::Admin,
        }
    }

    /// Whether this profile may list company accounts.
    #[must_use]
    pub const fn can_view_clients(&self) -> bool {
        match &self.role {
            RoleProfile::Admin(admin) => admin.permissions.can_view,
            RoleProfile::Company(_) => false,
        }
    }
}

/// Role-dependent profile fields.
///
/// Internally tagged so company fields and permission flags serialize
/// inline next to the common fields, with `userType` as the discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "userType", rename_all = "lowercase")]
pub enum RoleProfile {
    Company(CompanyDetails),
    Admin(AdminDetails),
}

/// Business fields carried by company accounts.
///
/// The optional-at-registration fields default to empty strings rather than
/// being absent, matching documents written since the first release.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetails {
    pub company_name: String,
    /// Fiscal identification code.
    pub cui: String,
    #[serde(default)]
    pub registration_number: String,
    /// Registered office address.
    pub social_address: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub iban: String,
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    pub vat_payer: bool,
    pub collaboration_type: CollaborationType,
    #[serde(default)]
    pub other_collaboration_details: String,
    #[serde(default)]
    pub preferred_channel: PreferredChannel,
    #[serde(default)]
    pub preferred_language: PreferredLanguage,
}

/// Permission flags carried by admin accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDetails {
    pub permissions: AdminPermissions,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn company_profile() -> UserProfile {
        UserProfile {
            uid: UserId::new("u-1"),
            email: Email::parse("ana@firma.ro").unwrap(),
            display_name: Some("Ana Pop".to_owned()),
            created_at: None,
            contact_name: "Ana Pop".to_owned(),
            contact_position: "Director".to_owned(),
            phone_number: "+40700000000".to_owned(),
            terms_accepted: true,
            gdpr_accepted: true,
            role: RoleProfile::Company(CompanyDetails {
                company_name: "Firma SRL".to_owned(),
                cui: "RO123456".to_owned(),
                registration_number: "J12/345/2020".to_owned(),
                social_address: "Str. Lunga 1, Cluj".to_owned(),
                delivery_address: String::new(),
                iban: String::new(),
                bank: String::new(),
                vat_payer: true,
                collaboration_type: CollaborationType::Reseller,
                other_collaboration_details: String::new(),
                preferred_channel: PreferredChannel::Email,
                preferred_language: PreferredLanguage::Romanian,
            }),
        }
    }

    #[test]
    fn test_company_profile_field_names() {
        let json = serde_json::to_value(company_profile()).unwrap();
        assert_eq!(json["userType"], "company");
        assert_eq!(json["companyName"], "Firma SRL");
        assert_eq!(json["cui"], "RO123456");
        assert_eq!(json["socialAddress"], "Str. Lunga 1, Cluj");
        assert_eq!(json["collaborationType"], "reseller");
        assert_eq!(json["preferredLanguage"], "rom");
        assert_eq!(json["contactName"], "Ana Pop");
        // Admin-only fields must be absent on company profiles.
        assert!(json.get("permissions").is_none());
        // createdAt is stamped by the store, not serialized when unset.
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_admin_profile_field_names() {
        let profile = UserProfile {
            uid: UserId::new("u-2"),
            email: Email::parse("admin@marigold.trade").unwrap(),
            display_name: None,
            created_at: None,
            contact_name: "Admin".to_owned(),
            contact_position: String::new(),
            phone_number: "+40711111111".to_owned(),
            terms_accepted: true,
            gdpr_accepted: true,
            role: RoleProfile::Admin(AdminDetails {
                permissions: AdminPermissions::default(),
            }),
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["userType"], "admin");
        assert_eq!(json["permissions"]["canView"], true);
        // Company-only fields must be absent on admin profiles.
        assert!(json.get("companyName").is_none());
    }

    #[test]
    fn test_profile_roundtrip_through_document() {
        let profile = company_profile();
        let value = serde_json::to_value(&profile).unwrap();
        let back: UserProfile = serde_json::from_value(value).unwrap();
        assert_eq!(back.uid, profile.uid);
        assert_eq!(back.user_type(), UserType::Company);
        match back.role {
            RoleProfile::Company(details) => {
                assert_eq!(details.company_name, "Firma SRL");
                assert!(details.vat_payer);
            }
            RoleProfile::Admin(_) => panic!("role changed during roundtrip"),
        }
    }

    #[test]
    fn test_stored_document_with_created_at_parses() {
        let doc = json!({
            "uid": "u-3",
            "email": "x@y.z",
            "createdAt": "2026-01-01T00:00:00Z",
            "contactName": "X",
            "phoneNumber": "1",
            "termsAccepted": true,
            "gdprAccepted": true,
            "userType": "admin",
            "permissions": {
                "canView": true,
                "canEdit": false,
                "canDelete": false,
                "canManageUsers": false
            }
        });
        let profile: UserProfile = serde_json::from_value(doc).unwrap();
        assert!(profile.created_at.is_some());
        assert!(profile.can_view_clients());
    }
}
