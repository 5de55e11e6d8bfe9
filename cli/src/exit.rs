//! Maps the error taxonomy to the exit codes in spec §6 "CLI surface":
//! 0 success, 1 general, 2 validation, 3 connectivity, 4 permission,
//! 5 not found, 6 version mismatch.

pub fn code_for(err: &anyhow::Error) -> i32 {
    if let Some(model_err) = err.downcast_ref::<model::Error>() {
        return code_for_model_error(model_err);
    }
    1
}

fn code_for_model_error(err: &model::Error) -> i32 {
    use model::Error;
    match err {
        Error::Validation(_) => 2,
        Error::NotFound(_) => 5,
        Error::Kube(kube::Error::Api(resp)) => match resp.code {
            403 => 4,
            404 => 5,
            _ => 3,
        },
        Error::Kube(_) => 3,
        _ => 1,
    }
}
