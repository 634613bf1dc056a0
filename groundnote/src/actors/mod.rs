pub mod search_session;

pub use search_session::{
    run_query, SearchSessionActor, SearchSessionArguments, SearchSessionError, SearchSessionMsg,
};
