mod submission;
mod support;
