//! 数据传输对象
//!
//! 包含所有请求和响应的数据结构，JSON 字段统一使用 camelCase

pub mod request;
pub mod response;

pub use request::{
    AdminCreateUserRequest, ApproveSubmissionRequest, BroadcastNotificationRequest,
    BuyEntriesRequest, CompleteReferralRequest, CreateRaffleRequest, CrmAction,
    DeleteNotificationRequest, ListNotificationsRequest, MarkReadRequest, NotificationAction,
    PurchaseCreditsRequest, RaffleAction, RaffleIdRequest, ReferralAction,
    RegisterReferralRequest, SendNotificationRequest, UnlockCrmRequest,
    UpdatePurchaseStatusRequest,
};
pub use response::{
    AffectedResponse, ApiResponse, BuyEntriesResponse, CrmDataResponse, CrmParticipantDto,
    CrmStatusResponse, Demographics, DrawResponse, NotificationListResponse,
    PurchaseStatusResponse, RaffleEntriesResponse, ReferralCodeResponse, ReferralResponse,
    SubmissionReviewResponse,
};
