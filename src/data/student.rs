use crate::error::{BouncerResult, InvalidGraduationYearSnafu, MissingNameSnafu};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Professor,
    #[serde(rename = "TA")]
    Ta,
    #[serde(rename = "Student Leadership")]
    StudentLeadership,
    #[serde(rename = "Alumni Board")]
    AlumniBoard,
}

impl Role {
    pub const ALL: [Self; 4] = [
        Self::Professor,
        Self::Ta,
        Self::StudentLeadership,
        Self::AlumniBoard,
    ];

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Professor => "Professor",
            Self::Ta => "TA",
            Self::StudentLeadership => "Student Leadership",
            Self::AlumniBoard => "Alumni Board",
        }
    }

    /// Name of the checkbox carrying this role in the student forms.
    pub const fn form_field(self) -> &'static str {
        match self {
            Self::Professor => "role_professor",
            Self::Ta => "role_ta",
            Self::StudentLeadership => "role_student_leadership",
            Self::AlumniBoard => "role_alumni_board",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl StudentRecord {
    pub fn roles_display(&self) -> String {
        self.roles
            .iter()
            .map(|role| role.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn graduation_year_display(&self) -> String {
        self.graduation_year
            .map(|year| year.to_string())
            .unwrap_or_default()
    }
}

/// Body of `POST /api/users` and `PUT /api/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub graduation_year: Option<i32>,
    pub roles: BTreeSet<Role>,
}

/// What the add/edit overlays post back. Kept around on failure so the form can be
/// re-rendered with what the user typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub graduation_year: String,
    pub role_professor: Option<String>,
    pub role_ta: Option<String>,
    pub role_student_leadership: Option<String>,
    pub role_alumni_board: Option<String>,
}

impl StudentForm {
    pub fn from_record(record: &StudentRecord) -> Self {
        let checked = |role| record.roles.contains(&role).then(|| "on".to_string());

        Self {
            name: record.name.clone(),
            graduation_year: record.graduation_year_display(),
            role_professor: checked(Role::Professor),
            role_ta: checked(Role::Ta),
            role_student_leadership: checked(Role::StudentLeadership),
            role_alumni_board: checked(Role::AlumniBoard),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        let field = match role {
            Role::Professor => &self.role_professor,
            Role::Ta => &self.role_ta,
            Role::StudentLeadership => &self.role_student_leadership,
            Role::AlumniBoard => &self.role_alumni_board,
        };
        field.as_deref().is_some_and(|value| !value.is_empty())
    }

    pub fn selected_roles(&self) -> BTreeSet<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.has_role(*role))
            .collect()
    }

    /// A blank year means pre-core (or a professor); anything else has to be exactly four
    /// digits.
    pub fn parse_graduation_year(&self) -> BouncerResult<Option<i32>> {
        let trimmed = self.graduation_year.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let four_digits = trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit());
        match trimmed.parse::<i32>() {
            Ok(year) if four_digits && year > 0 => Ok(Some(year)),
            _ => InvalidGraduationYearSnafu {
                original: trimmed.to_string(),
            }
            .fail(),
        }
    }

    pub fn to_new_student(&self) -> BouncerResult<NewStudent> {
        let name = self.name.trim();
        snafu::ensure!(!name.is_empty(), MissingNameSnafu);

        Ok(NewStudent {
            name: name.to_string(),
            graduation_year: self.parse_graduation_year()?,
            roles: self.selected_roles(),
        })
    }
}
