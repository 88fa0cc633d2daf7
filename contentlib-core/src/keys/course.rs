use std::fmt;
use std::str::FromStr;

use super::{check_local_id, check_segment, KeyError};

const COURSE_PREFIX: &str = "course-v1";
const BLOCK_PREFIX: &str = "block-v1";

/// Key of a course, the usual learning context that embeds library content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseKey {
    org: String,
    course: String,
    run: String,
}

impl CourseKey {
    pub fn new(org: &str, course: &str, run: &str) -> Result<Self, KeyError> {
        let input = format!("{}:{}+{}+{}", COURSE_PREFIX, org, course, run);
        check_segment("course", &input, "org", org)?;
        check_segment("course", &input, "course", course)?;
        check_segment("course", &input, "run", run)?;
        Ok(Self {
            org: org.to_string(),
            course: course.to_string(),
            run: run.to_string(),
        })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn run(&self) -> &str {
        &self.run
    }

    pub fn make_usage_key(
        &self,
        block_type: &str,
        block_id: &str,
    ) -> Result<CourseUsageKey, KeyError> {
        let input = format!(
            "{}:{}+{}+{}+type@{}+block@{}",
            BLOCK_PREFIX, self.org, self.course, self.run, block_type, block_id
        );
        check_segment("course usage", &input, "block type", block_type)?;
        check_local_id("course usage", &input, block_id)?;
        Ok(CourseUsageKey {
            course: self.clone(),
            block_type: block_type.to_string(),
            block_id: block_id.to_string(),
        })
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}+{}", COURSE_PREFIX, self.org, self.course, self.run)
    }
}

impl FromStr for CourseKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(COURSE_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| KeyError::new("course", s, "expected course-v1:{org}+{course}+{run}"))?;
        let parts: Vec<&str> = body.split('+').collect();
        match parts.as_slice() {
            [org, course, run] => CourseKey::new(org, course, run).map_err(|e| KeyError {
                input: s.to_string(),
                ..e
            }),
            _ => Err(KeyError::new("course", s, "expected exactly three '+' separated parts")),
        }
    }
}

/// Key of a block inside a course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseUsageKey {
    course: CourseKey,
    block_type: String,
    block_id: String,
}

impl CourseUsageKey {
    pub fn course_key(&self) -> &CourseKey {
        &self.course
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }
}

impl fmt::Display for CourseUsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}+{}+{}+type@{}+block@{}",
            BLOCK_PREFIX,
            self.course.org,
            self.course.course,
            self.course.run,
            self.block_type,
            self.block_id
        )
    }
}

impl FromStr for CourseUsageKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            KeyError::new(
                "course usage",
                s,
                "expected block-v1:{org}+{course}+{run}+type@{type}+block@{id}",
            )
        };
        let body = s
            .strip_prefix(BLOCK_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(malformed)?;
        let parts: Vec<&str> = body.split('+').collect();
        let [org, course, run, block_type, block_id] = parts.as_slice() else {
            return Err(malformed());
        };
        let block_type = block_type.strip_prefix("type@").ok_or_else(malformed)?;
        let block_id = block_id.strip_prefix("block@").ok_or_else(malformed)?;
        CourseKey::new(org, course, run)
            .and_then(|course| course.make_usage_key(block_type, block_id))
            .map_err(|e| KeyError {
                input: s.to_string(),
                ..e
            })
    }
}
