//! 请求校验
//!
//! 每个请求类型可注册零到多个校验器；校验器只检查请求本身，不访问存储。
//! 所有校验器都会运行，失败项汇总为一个 [`ValidationErrors`]。
use crate::request::RequestEnvelope;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 单个字段的校验失败
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// 一次请求的全部校验失败
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    request: &'static str,
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(request: &'static str, errors: Vec<FieldError>) -> Self {
        Self { request, errors }
    }

    pub fn request(&self) -> &'static str {
        self.request
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.request)?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// 请求校验器
pub trait Validator<R>: Send + Sync {
    /// 返回全部失败项；为空表示通过
    fn validate(&self, request: &R) -> Vec<FieldError>;
}

/// 以闭包作为校验器
pub struct FnValidator<R, F> {
    f: F,
    _marker: PhantomData<fn(&R)>,
}

pub fn validator_fn<R, F>(f: F) -> FnValidator<R, F>
where
    F: Fn(&R) -> Vec<FieldError> + Send + Sync,
{
    FnValidator {
        f,
        _marker: PhantomData,
    }
}

impl<R, F> Validator<R> for FnValidator<R, F>
where
    F: Fn(&R) -> Vec<FieldError> + Send + Sync,
{
    fn validate(&self, request: &R) -> Vec<FieldError> {
        (self.f)(request)
    }
}

type ErasedValidator = Arc<dyn Fn(&(dyn Any + Send)) -> Vec<FieldError> + Send + Sync>;

/// 按请求类型登记的校验器（构建期写入，运行期只读）
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    by_type: HashMap<TypeId, Vec<ErasedValidator>>,
}

impl ValidatorRegistry {
    pub fn register<R, V>(&mut self, validator: V)
    where
        R: Send + 'static,
        V: Validator<R> + 'static,
    {
        let erased: ErasedValidator = Arc::new(move |any: &(dyn Any + Send)| {
            match any.downcast_ref::<R>() {
                Some(request) => validator.validate(request),
                None => Vec::new(),
            }
        });
        self.by_type
            .entry(TypeId::of::<R>())
            .or_default()
            .push(erased);
    }

    pub fn count_for(&self, type_id: TypeId) -> usize {
        self.by_type.get(&type_id).map_or(0, Vec::len)
    }

    /// 运行该请求类型的全部校验器（按注册顺序），汇总失败项
    pub fn validate(&self, request: &RequestEnvelope) -> Vec<FieldError> {
        let Some(validators) = self.by_type.get(&request.type_id()) else {
            return Vec::new();
        };
        validators
            .iter()
            .flat_map(|v| (**v)(request.payload()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    struct Rename {
        name: String,
        tag: String,
    }

    impl Command for Rename {
        const NAME: &'static str = "Rename";
        type Output = ();
    }

    struct NameNotBlank;

    impl Validator<Rename> for NameNotBlank {
        fn validate(&self, request: &Rename) -> Vec<FieldError> {
            if request.name.trim().is_empty() {
                vec![FieldError::new("name", "must not be blank").with_code("blank")]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn all_validators_run_and_errors_are_aggregated() {
        let mut registry = ValidatorRegistry::default();
        registry.register::<Rename, _>(NameNotBlank);
        registry.register::<Rename, _>(validator_fn(|r: &Rename| {
            if r.tag.len() > 3 {
                vec![FieldError::new("tag", "too long")]
            } else {
                Vec::new()
            }
        }));

        let req = RequestEnvelope::command(Rename {
            name: " ".into(),
            tag: "abcd".into(),
        });
        let errors = registry.validate(&req);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].code.as_deref(), Some("blank"));
        assert_eq!(errors[1].field, "tag");

        let report = ValidationErrors::new(req.name(), errors);
        assert_eq!(report.to_string(), "Rename: name: must not be blank; tag: too long");
    }

    #[test]
    fn requests_without_validators_pass() {
        let registry = ValidatorRegistry::default();
        let req = RequestEnvelope::command(Rename {
            name: "ok".into(),
            tag: "t".into(),
        });
        assert!(registry.validate(&req).is_empty());
        assert_eq!(registry.count_for(TypeId::of::<Rename>()), 0);
    }
}
