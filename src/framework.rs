use lazy_static::lazy_static;
use std::collections::HashSet;

// Framework knowledge is data, not code: supporting a new framework means
// adding rows to these tables.

lazy_static! {
    /// Decorator method names that register the decorated function with a
    /// framework dispatcher (Flask/FastAPI routes, Celery tasks, Django
    /// receivers, Pydantic validators). Matched against the last segment of
    /// the dotted decorator name, so `app.route`, `bp.route` and
    /// `router.get` all hit.
    static ref DISPATCH_DECORATORS: HashSet<&'static str> = [
        "route",
        "get",
        "post",
        "put",
        "delete",
        "patch",
        "head",
        "options",
        "websocket",
        "task",
        "shared_task",
        "periodic_task",
        "receiver",
        "validator",
        "field_validator",
        "model_validator",
        "root_validator",
        "on_event",
        "middleware",
        "exception_handler",
        "listens_for",
    ]
    .into_iter()
    .collect();

    /// Base classes that put a class under framework control (ORM models,
    /// class-based views, serializers).
    static ref FRAMEWORK_BASES: HashSet<&'static str> = [
        "Model",
        "BaseModel",
        "View",
        "APIView",
        "ViewSet",
        "ModelViewSet",
        "Schema",
        "ModelSerializer",
        "Serializer",
        "TemplateView",
        "ListView",
        "DetailView",
    ]
    .into_iter()
    .collect();

    /// Dunder methods the Python runtime calls implicitly.
    static ref AUTO_CALLED_DUNDERS: HashSet<&'static str> = [
        "__init__",
        "__new__",
        "__enter__",
        "__exit__",
        "__del__",
        "__iter__",
        "__next__",
        "__call__",
        "__repr__",
        "__str__",
        "__eq__",
        "__hash__",
        "__len__",
        "__getitem__",
        "__setitem__",
    ]
    .into_iter()
    .collect();

    /// Method names commonly dispatched through Go interfaces; the engine
    /// reports them like any other method, so they are rooted here.
    static ref GO_INTERFACE_METHODS: HashSet<&'static str> = [
        "String",
        "Error",
        "Read",
        "Write",
        "Close",
        "ServeHTTP",
        "MarshalJSON",
        "UnmarshalJSON",
    ]
    .into_iter()
    .collect();
}

/// True when a decorator name (simple or dotted) registers the decorated
/// definition with a framework.
pub fn is_dispatch_decorator(name: &str) -> bool {
    let last = name.rsplit('.').next().unwrap_or(name);
    DISPATCH_DECORATORS.contains(last)
}

/// True when any base class marks the class as framework-managed.
pub fn has_framework_base(base_classes: &[String]) -> bool {
    base_classes
        .iter()
        .any(|base| FRAMEWORK_BASES.contains(base.as_str()))
}

pub fn is_auto_called_dunder(name: &str) -> bool {
    AUTO_CALLED_DUNDERS.contains(name)
}

pub fn is_go_interface_method(name: &str) -> bool {
    GO_INTERFACE_METHODS.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_decorators_match_by_last_segment() {
        assert!(is_dispatch_decorator("app.route"));
        assert!(is_dispatch_decorator("bp.route"));
        assert!(is_dispatch_decorator("router.get"));
        assert!(is_dispatch_decorator("celery.task"));
        assert!(is_dispatch_decorator("receiver"));
        assert!(!is_dispatch_decorator("staticmethod"));
        assert!(!is_dispatch_decorator("functools.wraps"));
    }

    #[test]
    fn test_framework_bases() {
        assert!(has_framework_base(&["BaseModel".to_string()]));
        assert!(!has_framework_base(&["object".to_string()]));
    }

    #[test]
    fn test_dunders() {
        assert!(is_auto_called_dunder("__init__"));
        assert!(is_auto_called_dunder("__getitem__"));
        assert!(!is_auto_called_dunder("__custom__"));
    }
}
