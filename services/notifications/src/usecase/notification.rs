use crate::domain::repository::NotificationRepository;
use crate::domain::types::Notification;
use crate::error::NotificationsServiceError;

pub struct ListNotificationsUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> ListNotificationsUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<Notification>, NotificationsServiceError> {
        Ok(self.repo.list_all().await?)
    }
}
