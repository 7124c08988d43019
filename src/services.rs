pub mod proposal_service;
pub mod report_service;
pub mod whatsapp;
pub mod goals;
